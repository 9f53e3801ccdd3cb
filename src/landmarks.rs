// Landmark normalization: one frame's 21-point hand detection becomes a
// [`GestureSample`] (mirrored fingertip, pinch distance, finger openness).

use crate::types::Point2D;

/// Hand landmark indices (MediaPipe hand landmark model convention).
#[allow(dead_code)]
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

pub const LANDMARK_COUNT: usize = 21;

/// Finger order used by [`GestureSample::fingers_open`].
pub const THUMB: usize = 0;
pub const INDEX: usize = 1;
pub const MIDDLE: usize = 2;
pub const RING: usize = 3;
pub const PINKY: usize = 4;

/// (tip, proximal joint) per finger. The thumb has no PIP; its IP joint plays that role.
const FINGER_JOINTS: [(usize, usize); 5] = [
    (index::THUMB_TIP, index::THUMB_IP),
    (index::INDEX_FINGER_TIP, index::INDEX_FINGER_PIP),
    (index::MIDDLE_FINGER_TIP, index::MIDDLE_FINGER_PIP),
    (index::RING_FINGER_TIP, index::RING_FINGER_PIP),
    (index::PINKY_TIP, index::PINKY_PIP),
];

/// One detected hand, straight from the detector: normalized `[0,1]`
/// camera coordinates, not mirrored.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub points: [Point2D; LANDMARK_COUNT],
    pub score: f32,
}

impl HandLandmarks {
    /// A plausible upright hand whose index tip sits at `tip` (camera
    /// coordinates). Drives simulation mode and tests.
    ///
    /// * `index_extended`: index tip farther from the wrist than its PIP.
    /// * `pinched`: thumb tip right next to the index tip.
    pub fn synthetic(tip: Point2D, index_extended: bool, pinched: bool) -> Self {
        let at = |dx: f32, dy: f32| Point2D::new(tip.x + dx, tip.y + dy);
        let mut points = [Point2D::default(); LANDMARK_COUNT];

        points[index::WRIST] = at(0.0, 0.25);

        // Index: extended points the tip up and away from the wrist;
        // curled folds the PIP above the tip.
        let pip_dy = if index_extended { 0.08 } else { -0.05 };
        points[index::INDEX_FINGER_MCP] = at(0.0, 0.15);
        points[index::INDEX_FINGER_PIP] = at(0.0, pip_dy);
        points[index::INDEX_FINGER_DIP] = at(0.0, pip_dy / 2.0);
        points[index::INDEX_FINGER_TIP] = tip;

        // Thumb: off to the side, or touching the index tip.
        let (tx, ty) = if pinched { (0.02, 0.0) } else { (0.12, 0.12) };
        points[index::THUMB_CMC] = at(0.05, 0.22);
        points[index::THUMB_MCP] = at(0.08, 0.18);
        points[index::THUMB_IP] = at(tx * 0.8, ty + 0.03);
        points[index::THUMB_TIP] = at(tx, ty);

        // Remaining fingers curled into the palm.
        for (k, mcp) in [index::MIDDLE_FINGER_MCP, index::RING_FINGER_MCP, index::PINKY_MCP]
            .into_iter()
            .enumerate()
        {
            let dx = -0.03 * (k as f32 + 1.0);
            points[mcp] = at(dx, 0.15);
            points[mcp + 1] = at(dx, 0.08); // PIP
            points[mcp + 2] = at(dx, 0.11); // DIP
            points[mcp + 3] = at(dx, 0.13); // TIP, back toward the wrist
        }

        Self { points, score: 1.0 }
    }

    fn point(&self, i: usize) -> Point2D {
        self.points[i]
    }
}

/// Canonical per-frame gesture input. Immutable once produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSample {
    /// Index fingertip, normalized and mirrored (`x' = 1 - x`).
    pub tip: Point2D,
    /// Index tip to thumb tip, normalized units.
    pub pinch_distance: f32,
    /// Thumb, index, middle, ring, pinky.
    pub fingers_open: [bool; 5],
}

/// Turn one frame's detection into a gesture sample; `None` means no hand.
///
/// The horizontal axis is mirrored here, once, because the camera feed is
/// shown mirrored to the player. Nothing downstream mirrors again.
pub fn normalize(hand: Option<&HandLandmarks>) -> Option<GestureSample> {
    let hand = hand?;
    let raw_tip = hand.point(index::INDEX_FINGER_TIP);
    let thumb_tip = hand.point(index::THUMB_TIP);

    Some(GestureSample {
        tip: Point2D::new(1.0 - raw_tip.x, raw_tip.y),
        pinch_distance: raw_tip.distance(thumb_tip),
        fingers_open: FINGER_JOINTS.map(|(tip, pip)| finger_open(hand, tip, pip)),
    })
}

/// A finger counts as extended when its tip is farther from the wrist than
/// its proximal joint. A curl proxy, not a joint-angle measurement.
fn finger_open(hand: &HandLandmarks, tip: usize, pip: usize) -> bool {
    let wrist = hand.point(index::WRIST);
    hand.point(tip).distance(wrist) > hand.point(pip).distance(wrist)
}
