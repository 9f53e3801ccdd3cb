// Temporal low-pass filter on the fingertip cursor.

use crate::types::Point2D;

pub const DEFAULT_SMOOTHING: f32 = 0.5;

/// Exponential moving average of the fingertip in surface pixels.
/// The first sample after a reset is taken as-is.
#[derive(Clone, Debug)]
pub struct PositionSmoother {
    factor: f32,
    width: f32,
    height: f32,
    smoothed: Option<Point2D>,
}

impl PositionSmoother {
    pub fn new(factor: f32, surface_width: usize, surface_height: usize) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            width: surface_width as f32,
            height: surface_height as f32,
            smoothed: None,
        }
    }

    /// Blend toward an already-mirrored normalized tip and return the new
    /// pixel position. No second mirror happens here.
    pub fn update(&mut self, tip: Point2D) -> Point2D {
        let target = Point2D::new(tip.x * self.width, tip.y * self.height);
        let next = match self.smoothed {
            Some(prev) => prev.lerp(target, self.factor),
            None => target,
        };
        self.smoothed = Some(next);
        next
    }

    /// Hand lost: the next reappearance starts unsmoothed.
    pub fn reset(&mut self) {
        self.smoothed = None;
    }

    pub fn current(&self) -> Option<Point2D> {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_unsmoothed() {
        let mut s = PositionSmoother::new(DEFAULT_SMOOTHING, 800, 600);
        let p = s.update(Point2D::new(0.25, 0.5));
        assert_eq!(p, Point2D::new(200.0, 300.0));
    }

    #[test]
    fn moves_halfway_per_frame() {
        let mut s = PositionSmoother::new(DEFAULT_SMOOTHING, 800, 600);
        s.update(Point2D::new(0.0, 0.0));
        let p = s.update(Point2D::new(1.0, 1.0));
        assert_eq!(p, Point2D::new(400.0, 300.0));
    }

    #[test]
    fn converges_geometrically() {
        let mut s = PositionSmoother::new(DEFAULT_SMOOTHING, 800, 600);
        s.update(Point2D::new(0.0, 0.0));
        let target = Point2D::new(0.75, 0.25);
        let mut err = f32::MAX;
        for _ in 0..30 {
            let p = s.update(target);
            let e = p.distance(Point2D::new(600.0, 150.0));
            assert!(e <= err);
            err = e;
        }
        // 0.5^30 of the initial ~618 px gap.
        assert!(err < 1e-3);
    }

    #[test]
    fn reset_discards_history() {
        let mut s = PositionSmoother::new(DEFAULT_SMOOTHING, 100, 100);
        s.update(Point2D::new(0.1, 0.1));
        s.reset();
        assert!(s.current().is_none());
        assert_eq!(s.update(Point2D::new(0.5, 0.75)), Point2D::new(50.0, 75.0));
    }
}
