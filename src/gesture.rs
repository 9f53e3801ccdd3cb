// Gesture classification: a [`GestureSample`] becomes a discrete [`InputState`].
//
// Two draw triggers are supported behind one classifier:
//
// | Policy | Draw when | Otherwise |
// |---|---|---|
// | Index extension | index finger extended | Hover |
// | Pinch | thumb-to-index distance < threshold | Hover |
//
// No hand is always `Idle`. The classifier is stateless per frame.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::landmarks::{GestureSample, INDEX};

/// Default pinch threshold, normalized coordinates.
pub const DEFAULT_PINCH_THRESHOLD: f32 = 0.05;

/// What the hand is doing this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputState {
    /// No hand in view.
    Idle,
    /// Hand present, pen up.
    Hover,
    /// Hand present, pen down.
    Draw,
}

impl InputState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hover => "hover",
            Self::Draw => "draw",
        }
    }
}

/// Policy selector as it appears in config files and on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Index,
    Pinch,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "index" => Ok(Self::Index),
            "pinch" => Ok(Self::Pinch),
            other => Err(format!("unknown gesture policy `{other}` (expected index or pinch)")),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Pinch => write!(f, "pinch"),
        }
    }
}

/// The draw trigger in use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GesturePolicy {
    /// Draw while the index finger is extended ("point to draw, fist to move").
    IndexExtension,
    /// Draw while thumb and index tips are closer than `threshold`.
    Pinch { threshold: f32 },
}

impl GesturePolicy {
    pub fn from_kind(kind: PolicyKind, pinch_threshold: f32) -> Self {
        match kind {
            PolicyKind::Index => Self::IndexExtension,
            PolicyKind::Pinch => Self::Pinch { threshold: pinch_threshold },
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::IndexExtension => PolicyKind::Index,
            Self::Pinch { .. } => PolicyKind::Pinch,
        }
    }

    pub fn classify(&self, sample: Option<&GestureSample>) -> InputState {
        let Some(sample) = sample else {
            return InputState::Idle;
        };
        let drawing = match *self {
            Self::IndexExtension => sample.fingers_open[INDEX],
            Self::Pinch { threshold } => sample.pinch_distance < threshold,
        };
        if drawing { InputState::Draw } else { InputState::Hover }
    }
}

impl Default for GesturePolicy {
    fn default() -> Self {
        Self::IndexExtension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2D;

    fn sample(index_open: bool, pinch: f32) -> GestureSample {
        GestureSample {
            tip: Point2D::new(0.5, 0.5),
            pinch_distance: pinch,
            fingers_open: [false, index_open, false, false, false],
        }
    }

    #[test]
    fn no_hand_is_idle_for_every_policy() {
        assert_eq!(GesturePolicy::IndexExtension.classify(None), InputState::Idle);
        assert_eq!(GesturePolicy::Pinch { threshold: 0.05 }.classify(None), InputState::Idle);
    }

    #[test]
    fn index_extended_draws() {
        let p = GesturePolicy::IndexExtension;
        // Pinch distance is irrelevant to this policy.
        for pinch in [0.0, 0.04, 0.3, 1.0] {
            assert_eq!(p.classify(Some(&sample(true, pinch))), InputState::Draw);
            assert_eq!(p.classify(Some(&sample(false, pinch))), InputState::Hover);
        }
    }

    #[test]
    fn pinch_below_threshold_draws() {
        let p = GesturePolicy::Pinch { threshold: DEFAULT_PINCH_THRESHOLD };
        assert_eq!(p.classify(Some(&sample(false, 0.01))), InputState::Draw);
        assert_eq!(p.classify(Some(&sample(true, 0.05))), InputState::Hover);
        assert_eq!(p.classify(Some(&sample(true, 0.2))), InputState::Hover);
    }

    #[test]
    fn policy_kind_parses_and_maps() {
        assert_eq!("PINCH".parse::<PolicyKind>(), Ok(PolicyKind::Pinch));
        assert!("wave".parse::<PolicyKind>().is_err());
        let p = GesturePolicy::from_kind(PolicyKind::Pinch, 0.08);
        assert_eq!(p, GesturePolicy::Pinch { threshold: 0.08 });
        assert_eq!(p.kind(), PolicyKind::Pinch);
    }
}
