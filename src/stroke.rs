// Stroke rendering onto the drawing surface.
// Visual expectation: while the hand is in `Draw`, a thick black line with
// round ends follows the smoothed fingertip; lifting the pen (Hover/Idle)
// ends the stroke, and the next Draw starts a fresh one without a bridge.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::error::Error;
use crate::gesture::InputState;
use crate::types::{FrameBuffer, Point2D};

/// An immutable copy of the canvas, taken between frame callbacks.
/// Encoding is left to whoever consumes it (the poll worker), so taking one
/// never stalls the frame path.
#[derive(Clone, Debug)]
pub struct Snapshot {
    image: RgbImage,
}

impl Snapshot {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// JPEG bytes, the format the classifier expects.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
        Ok(bytes)
    }
}

/// Owns the drawing surface and the open end of the current stroke.
/// Committed pixels are append-only until `clear()`.
pub struct StrokeRenderer {
    surface: FrameBuffer,
    background: u32,
    ink: u32,
    radius: f32,              // half the line width, pixels
    previous: Option<Point2D>, // stroke anchor; None = pen up
    segments: usize,          // committed since the last clear
}

impl StrokeRenderer {
    /// A blank surface of `width x height` filled with `background`.
    pub fn new(width: usize, height: usize, background: u32, ink: u32, line_width: f32) -> Self {
        Self {
            surface: FrameBuffer::filled(width, height, background),
            background,
            ink,
            radius: (line_width / 2.0).max(0.5),
            previous: None,
            segments: 0,
        }
    }

    /// Feed one frame. Only `Draw` with a position extends the stroke; the
    /// first `Draw` after a pen-up just sets the anchor. Returns true when a
    /// segment was committed.
    pub fn apply(&mut self, state: InputState, at: Option<Point2D>) -> bool {
        match (state, at) {
            (InputState::Draw, Some(p)) => {
                let drew = match self.previous {
                    Some(prev) => {
                        self.stroke_segment(prev, p);
                        true
                    }
                    None => false,
                };
                self.previous = Some(p);
                drew
            }
            _ => {
                self.lift();
                false
            }
        }
    }

    /// End the current stroke without drawing.
    pub fn lift(&mut self) {
        self.previous = None;
    }

    /// Repaint everything with the background and forget the stroke anchor.
    pub fn clear(&mut self) {
        for px in &mut self.surface.pixels { *px = self.background; }
        self.previous = None;
        self.segments = 0;
        debug!("drawing surface cleared");
    }

    /// Copy of the current canvas; None only for a zero-sized surface.
    pub fn snapshot(&self) -> Option<Snapshot> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return None;
        }
        Some(Snapshot { image: self.surface.to_rgb_image() })
    }

    /// Nothing committed since the last clear.
    pub fn is_blank(&self) -> bool {
        self.segments == 0
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn previous_point(&self) -> Option<Point2D> {
        self.previous
    }

    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    /// Fill every pixel whose centre lies within `radius` of segment a→b.
    /// The capsule shape gives round caps, and consecutive segments share an
    /// endpoint disc, which gives round joins.
    fn stroke_segment(&mut self, a: Point2D, b: Point2D) {
        let r = self.radius;
        let w = self.surface.width as i32;
        let h = self.surface.height as i32;

        // Scan just the bounding box, clamped to the surface.
        let x_min = ((a.x.min(b.x) - r).floor() as i32).max(0);
        let x_max = ((a.x.max(b.x) + r).ceil() as i32).min(w - 1);
        let y_min = ((a.y.min(b.y) - r).floor() as i32).max(0);
        let y_max = ((a.y.max(b.y) + r).ceil() as i32).min(h - 1);

        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len2 = dx * dx + dy * dy;
        let r2 = r * r;

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                // Closest point on the segment (t clamped to the ends).
                let t = if len2 > 0.0 {
                    (((px - a.x) * dx + (py - a.y) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let cx = a.x + t * dx;
                let cy = a.y + t * dy;
                let d2 = (px - cx) * (px - cx) + (py - cy) * (py - cy);
                if d2 <= r2 {
                    let idx = y as usize * self.surface.width + x as usize;
                    self.surface.pixels[idx] = self.ink;
                }
            }
        }
        self.segments += 1;
    }
}
