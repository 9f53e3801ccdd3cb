// # ocean-canvas
//
// Air-drawing game: the index fingertip, seen by a webcam hand-landmark
// detector, draws on a canvas while a vision model is asked every 1.5 s
// what the sketch shows. Name the target word before the 20 s countdown
// runs out and the round is won.
//
// ## Modules
//
// | Module        | Role                                                        |
// |---------------|-------------------------------------------------------------|
// | `types`       | `FrameBuffer`, `Point2D`                                    |
// | `error`       | crate-wide `Error`                                          |
// | `config`      | TOML settings with defaults                                 |
// | `clock`       | deadline-based periodic timer                               |
// | `words`       | random target word                                          |
// | `landmarks`   | 21-point hand model, normalization to a `GestureSample`     |
// | `gesture`     | draw/hover/idle policies (index extension, pinch)           |
// | `smoothing`   | exponential smoothing into canvas pixels                    |
// | `stroke`      | stroke renderer, canvas snapshots                           |
// | `classifier`  | `Classifier` trait, subprocess and scripted backends        |
// | `poller`      | periodic snapshot submission on a worker thread             |
// | `session`     | round state machine, countdown, stale-response fencing      |
// | `game`        | single-threaded coordinator of all of the above             |
// | `detector`    | landmark sources (camera + detector process, mouse)         |
// | `camera`      | webcam capture (feature `camera`)                           |
// | `draw`        | window, cursor, preview, bitmap font                        |
// | `app`         | run loop                                                    |

pub mod app;
#[cfg(feature = "camera")]
pub mod camera;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod detector;
pub mod draw;
pub mod error;
pub mod game;
pub mod gesture;
pub mod landmarks;
pub mod poller;
pub mod session;
pub mod smoothing;
pub mod stroke;
pub mod types;
pub mod words;

pub use config::Config;
pub use error::Error;
