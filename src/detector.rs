// Landmark sources: real (camera + detector subprocess) and simulated (mouse).
//
// The public interface is [`FrameEvent`] delivered over a `mpsc` channel.
// The event loop only ever looks at the newest event (last value wins); it
// never asks a source for a frame.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::landmarks::{HandLandmarks, LANDMARK_COUNT};
use crate::types::{FrameBuffer, Point2D};

/// Minimum detector confidence for a hand to count.
pub const MIN_HAND_SCORE: f32 = 0.5;

// ════════════════════════════════════════════════════════════════════════════
// FrameEvent + source plumbing
// ════════════════════════════════════════════════════════════════════════════

/// One camera frame's worth of input.
#[derive(Clone, Debug)]
pub struct FrameEvent {
    /// Detected hand, or None.
    pub hand: Option<HandLandmarks>,
    /// Mirrored camera image for the preview corner, when there is a camera.
    pub preview: Option<FrameBuffer>,
}

/// Anything that can push [`FrameEvent`]s at camera rate.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<FrameEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

/// Drain the channel and keep only the newest event.
/// `Err(Disconnected)` once the source has gone away and nothing is left.
pub fn latest(rx: &Receiver<FrameEvent>) -> Result<Option<FrameEvent>, TryRecvError> {
    let mut newest = None;
    loop {
        match rx.try_recv() {
            Ok(ev) => newest = Some(ev),
            Err(TryRecvError::Empty) => return Ok(newest),
            Err(TryRecvError::Disconnected) => {
                return if newest.is_some() { Ok(newest) } else { Err(TryRecvError::Disconnected) };
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Simulated hand: mouse drives the index fingertip
// ════════════════════════════════════════════════════════════════════════════

/// Build the hand the mouse stands for. The cursor is in (mirrored) window
/// pixels, so it is un-mirrored into camera space here; the normalizer
/// mirrors it back. Holding the button extends the index finger and closes
/// the pinch, so both gesture policies draw.
pub fn mouse_hand(x: f32, y: f32, width: usize, height: usize, pressed: bool) -> HandLandmarks {
    let tip = Point2D::new(1.0 - x / width as f32, y / height as f32);
    HandLandmarks::synthetic(tip, pressed, pressed)
}

// ════════════════════════════════════════════════════════════════════════════
// ProcessDetector: hand landmarks via an external subprocess
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[allow(dead_code)]
    #[serde(default)]
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionResult {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one detector answer line into the first confident, complete hand.
pub fn parse_detection(line: &str, min_score: f32) -> Result<Option<HandLandmarks>, Error> {
    let result: DetectionResult = serde_json::from_str(line)
        .map_err(|e| Error::Detector(format!("bad JSON ({e}): {}", line.trim())))?;

    if let Some(error) = result.error {
        warn!("detector reported: {error}");
        return Ok(None);
    }

    for hand in result.hands {
        if hand.score < min_score {
            continue;
        }
        if hand.landmarks.len() != LANDMARK_COUNT {
            warn!("expected {LANDMARK_COUNT} landmarks, got {}", hand.landmarks.len());
            continue;
        }
        let mut points = [Point2D::default(); LANDMARK_COUNT];
        for (slot, lm) in points.iter_mut().zip(&hand.landmarks) {
            *slot = Point2D::new(lm.x, lm.y);
        }
        debug!(handedness = %hand.handedness, score = hand.score, "hand detected");
        return Ok(Some(HandLandmarks { points, score: hand.score }));
    }
    Ok(None)
}

/// Long-lived detector subprocess. It must print `READY` once, then answer
/// each frame (LE u32 width, height, channels + raw RGB) with one JSON line.
pub struct ProcessDetector {
    process: Child,
    stdin: ChildStdin,
    stdout_reader: BufReader<ChildStdout>,
    min_score: f32,
}

impl ProcessDetector {
    pub fn spawn(argv: &[String]) -> Result<Self, Error> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("detector_command is empty".into()))?;

        info!("starting hand detector: {program}");
        let mut process = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("spawn {program}: {e}")))?;

        let stdin = process.stdin.take().ok_or_else(|| Error::Detector("no stdin".into()))?;
        let stdout = process.stdout.take().ok_or_else(|| Error::Detector("no stdout".into()))?;
        let mut stdout_reader = BufReader::new(stdout);

        let mut ready_line = String::new();
        stdout_reader.read_line(&mut ready_line)?;
        if ready_line.trim() != "READY" {
            let _ = process.kill();
            return Err(Error::Detector(format!("expected READY, got {:?}", ready_line.trim())));
        }
        info!("hand detector ready");

        Ok(Self { process, stdin, stdout_reader, min_score: MIN_HAND_SCORE })
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Result<Option<HandLandmarks>, Error> {
        let (w, h) = frame.dimensions();
        self.stdin.write_all(&w.to_le_bytes())?;
        self.stdin.write_all(&h.to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout_reader.read_line(&mut response)? == 0 {
            return Err(Error::Detector("detector closed its output".into()));
        }
        parse_detection(&response, self.min_score)
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CameraSource: camera + detector on one thread (feature = "camera")
// ════════════════════════════════════════════════════════════════════════════

/// Captures frames, runs the detector on each, and pushes the result with a
/// mirrored preview. The camera is opened on the source thread itself.
#[cfg(feature = "camera")]
pub struct CameraSource {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub detector_argv: Vec<String>,
}

#[cfg(feature = "camera")]
impl LandmarkSource for CameraSource {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        use crate::camera::CameraCapture;
        use tracing::error;

        let mut cam = match CameraCapture::new(self.index, self.width, self.height) {
            Ok(c) => c,
            Err(e) => {
                error!("{e}");
                return;
            }
        };
        let mut detector = match ProcessDetector::spawn(&self.detector_argv) {
            Ok(d) => Some(d),
            Err(e) => {
                error!("{e}; continuing with camera preview only");
                None
            }
        };
        debug!(resolution = ?cam.resolution(), "camera source running");

        loop {
            let frame = match cam.next_frame() {
                Ok(f) => f,
                Err(e) => {
                    error!("{e}");
                    return;
                }
            };
            let hand = match detector.as_mut().map(|d| d.detect(&frame)) {
                Some(Ok(hand)) => hand,
                Some(Err(e)) => {
                    warn!("{e}; hand detection disabled");
                    detector = None;
                    None
                }
                None => None,
            };
            let preview = Some(FrameBuffer::from_rgb_mirrored(&frame));
            if tx.send(FrameEvent { hand, preview }).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::normalize;

    fn hand_json(score: f32, count: usize) -> String {
        let lms: Vec<String> = (0..count)
            .map(|i| format!("{{\"x\":{},\"y\":0.5,\"z\":0.0}}", i as f32 / 100.0))
            .collect();
        format!(
            "{{\"hands\":[{{\"handedness\":\"Right\",\"score\":{score},\"landmarks\":[{}]}}],\"error\":null}}",
            lms.join(",")
        )
    }

    #[test]
    fn parses_confident_hand() {
        let hand = parse_detection(&hand_json(0.9, 21), MIN_HAND_SCORE).unwrap().unwrap();
        assert_eq!(hand.points[8], Point2D::new(0.08, 0.5));
        assert_eq!(hand.score, 0.9);
    }

    #[test]
    fn ignores_weak_or_partial_hands() {
        assert!(parse_detection(&hand_json(0.3, 21), MIN_HAND_SCORE).unwrap().is_none());
        assert!(parse_detection(&hand_json(0.9, 5), MIN_HAND_SCORE).unwrap().is_none());
        assert!(parse_detection("{\"hands\":[]}", MIN_HAND_SCORE).unwrap().is_none());
    }

    #[test]
    fn detector_error_is_no_hand() {
        let line = "{\"hands\":[],\"error\":\"model not loaded\"}";
        assert!(parse_detection(line, MIN_HAND_SCORE).unwrap().is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(parse_detection("not json", MIN_HAND_SCORE), Err(Error::Detector(_))));
    }

    #[test]
    fn latest_keeps_newest_event() {
        let (tx, rx) = mpsc::channel();
        for i in 0..3 {
            let hand = HandLandmarks::synthetic(Point2D::new(0.1 * i as f32, 0.5), true, false);
            tx.send(FrameEvent { hand: Some(hand), preview: None }).unwrap();
        }
        let ev = latest(&rx).unwrap().unwrap();
        assert_eq!(ev.hand.unwrap().points[8].x, 0.2);
        assert!(latest(&rx).unwrap().is_none());
        drop(tx);
        assert!(latest(&rx).is_err());
    }

    #[test]
    fn mouse_hand_lands_under_cursor() {
        let hand = mouse_hand(200.0, 150.0, 800, 600, true);
        let s = normalize(Some(&hand)).unwrap();
        assert!((s.tip.x * 800.0 - 200.0).abs() < 1e-3);
        assert!((s.tip.y * 600.0 - 150.0).abs() < 1e-3);
        assert!(s.fingers_open[crate::landmarks::INDEX]);
        assert!(s.pinch_distance < 0.05);
    }

    #[cfg(unix)]
    #[test]
    fn process_detector_handshake_and_frame() {
        // 12 header bytes + 2x1 RGB pixels = 18 bytes per frame.
        let argv: Vec<String> = ["sh", "-c", "echo READY; head -c 18 >/dev/null; echo '{\"hands\":[]}'"]
            .map(String::from)
            .to_vec();
        let mut d = ProcessDetector::spawn(&argv).unwrap();
        assert!(d.detect(&RgbImage::new(2, 1)).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn process_detector_requires_ready() {
        let argv: Vec<String> = ["sh", "-c", "echo hello"].map(String::from).to_vec();
        assert!(matches!(ProcessDetector::spawn(&argv), Err(Error::Detector(_))));
    }

    #[test]
    fn spawned_source_delivers_events() {
        struct Once;
        impl LandmarkSource for Once {
            fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
                let _ = tx.send(FrameEvent { hand: None, preview: None });
            }
        }
        let rx = spawn_landmark_source(Once);
        let ev = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert!(ev.hand.is_none());
    }
}
