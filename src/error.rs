// One error type for the whole library.
// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String),   // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String),   // Opening/starting the camera failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String),  // Grabbing/decoding a frame failed
    #[error("Landmark detector error: {0}")]
    Detector(String),     // The hand-landmark subprocess misbehaved
    #[error("Snapshot encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Classifier request failed: {0}")]
    ClassifierRequestFailed(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
