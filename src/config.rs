use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::DEFAULT_CLASSIFIER_TIMEOUT;
use crate::error::Error;
use crate::gesture::{DEFAULT_PINCH_THRESHOLD, PolicyKind};
use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::session::DEFAULT_ROUND_SECONDS;
use crate::smoothing::DEFAULT_SMOOTHING;

/// Everything tunable about a game, loaded from TOML.
/// Missing keys fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub surface_width: usize,
    pub surface_height: usize,
    /// Canvas fill, 0x00RRGGBB.
    pub background: u32,
    /// Stroke colour, 0x00RRGGBB.
    pub ink: u32,
    /// Stroke width in pixels.
    pub line_width: f32,
    pub policy: PolicyKind,
    /// Normalized thumb-to-index distance below which the pinch policy draws.
    pub pinch_threshold: f32,
    /// Blend factor toward the raw fingertip per frame.
    pub smoothing: f32,
    pub poll_interval_ms: u64,
    /// A classifier request with no answer after this long counts as failed.
    pub classifier_timeout_ms: u64,
    pub round_seconds: u32,
    pub words: Vec<String>,
    pub camera_index: u32,
    pub camera_width: u32,
    pub camera_height: u32,
    /// argv of the hand-landmark subprocess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_command: Option<Vec<String>>,
    /// argv of the classifier subprocess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_command: Option<Vec<String>>,
    /// Responses cycled by the offline classifier.
    pub offline_guesses: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            surface_width: 800,
            surface_height: 600,
            background: 0x00FF_FFFF,
            ink: 0x0000_0000,
            line_width: 6.0,
            policy: PolicyKind::Index,
            pinch_threshold: DEFAULT_PINCH_THRESHOLD,
            smoothing: DEFAULT_SMOOTHING,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            classifier_timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT.as_millis() as u64,
            round_seconds: DEFAULT_ROUND_SECONDS,
            words: ["Apple", "House", "Car", "Tree", "Smile", "Sun", "Mug", "Fish", "Boat"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            camera_index: 0,
            camera_width: 640,
            camera_height: 480,
            detector_command: None,
            classifier_command: None,
            offline_guesses: vec![
                "Line, Scribble, Curve".to_string(),
                "Circle, Ball, Sun".to_string(),
                "House, Box, Square".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(Error::Config("surface must be at least 1x1".into()));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(Error::Config(format!("smoothing must be in (0, 1], got {}", self.smoothing)));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        if self.classifier_timeout_ms == 0 {
            return Err(Error::Config("classifier_timeout_ms must be positive".into()));
        }
        if self.round_seconds == 0 {
            return Err(Error::Config("round_seconds must be positive".into()));
        }
        if self.words.is_empty() {
            return Err(Error::Config("word list is empty".into()));
        }
        Ok(())
    }
}
