// Core value types shared by the gesture pipeline, the canvas and the window.

use image::{Rgb, RgbImage};

#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A buffer of `width * height` pixels, all set to `fill`.
    pub fn filled(width: usize, height: usize, fill: u32) -> Self {
        Self { width, height, pixels: vec![fill; width * height] }
    }

    /// Pixel at (x,y), or None when outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Unpack 0x00RRGGBB into an `image` RGB buffer (for encoding).
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let px = self.pixels[y as usize * self.width + x as usize];
            Rgb([((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8])
        })
    }

    /// Pack an RGB camera image as 0x00RRGGBB, flipped left-right so the
    /// player sees themselves as in a mirror.
    pub fn from_rgb_mirrored(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let mut out = Vec::with_capacity((w as usize) * (h as usize));
        for y in 0..h {
            for x in (0..w).rev() {
                let p = img.get_pixel(x, y);
                out.push(((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32);
            }
        }
        Self { width: w as usize, height: h as usize, pixels: out }
    }
}

/// A 2D point. Normalized `[0,1]` coordinates for landmarks, pixels on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2D) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation: `amt = 0` stays at self, `amt = 1` lands on `target`.
    pub fn lerp(self, target: Point2D, amt: f32) -> Point2D {
        Point2D {
            x: (1.0 - amt) * self.x + amt * target.x,
            y: (1.0 - amt) * self.y + amt * target.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_image_unpacks_channels() {
        let mut fb = FrameBuffer::filled(2, 1, 0x00FF_FFFF);
        fb.pixels[1] = 0x0012_3456;
        let img = fb.to_rgb_image();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0x12, 0x34, 0x56]));
    }

    #[test]
    fn camera_image_is_mirrored() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        let fb = FrameBuffer::from_rgb_mirrored(&img);
        assert_eq!(fb.pixels, vec![0x0000_00FF, 0, 0x00FF_0000]);
    }

    #[test]
    fn lerp_halfway() {
        let p = Point2D::new(0.0, 10.0).lerp(Point2D::new(10.0, 0.0), 0.5);
        assert_eq!(p, Point2D::new(5.0, 5.0));
    }
}
