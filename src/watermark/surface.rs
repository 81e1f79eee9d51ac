/// Off-screen raster surface for compositing
///
/// A thin layer over an `RgbaImage`: allocation that reports failure
/// instead of aborting, alpha-blended fills, rounded-rect clipping,
/// bitmap text, and JPEG encoding of the final snapshot.

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgba, RgbImage, RgbaImage};

use super::text::BitmapFont;
use crate::error::CompositeError;

/// Axis-aligned rectangle with uniformly rounded corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

impl RoundedRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Point-in-shape test (pixel centers are sampled at +0.5)
    pub fn contains(&self, px: f32, py: f32) -> bool {
        if px < self.x || px >= self.right() || py < self.y || py >= self.bottom() {
            return false;
        }
        let r = self
            .radius
            .min(self.width / 2.0)
            .min(self.height / 2.0)
            .max(0.0);
        if r <= 0.1 {
            return true;
        }
        // Inside the cross formed by the straight edges
        if (px >= self.x + r && px <= self.right() - r)
            || (py >= self.y + r && py <= self.bottom() - r)
        {
            return true;
        }
        let cx = if px < self.x + r { self.x + r } else { self.right() - r };
        let cy = if py < self.y + r { self.y + r } else { self.bottom() - r };
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= r * r
    }
}

/// Source-over blend of `src` onto `dst`
fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f32::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    let inv = 1.0 - a;
    let mix = |d: u8, s: u8| (f32::from(d) * inv + f32::from(s) * a).round().clamp(0.0, 255.0) as u8;
    let out_a = (f32::from(dst[3]) * inv + f32::from(src[3])).round().clamp(0.0, 255.0) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}

/// Pixel-space drawing target
pub struct Surface {
    canvas: RgbaImage,
}

impl Surface {
    /// Allocate a transparent surface, failing cleanly on absurd sizes
    pub fn allocate(width: u32, height: u32) -> Result<Self, CompositeError> {
        let failed = || CompositeError::SurfaceAllocationFailed { width, height };

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .filter(|&n| n > 0)
            .ok_or_else(failed)?;

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| failed())?;
        buf.resize(len, 0);

        let canvas = RgbaImage::from_raw(width, height, buf).ok_or_else(failed)?;
        Ok(Self { canvas })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Copy an image onto the surface with its top-left at (`x`, `y`)
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        imageops::replace(&mut self.canvas, image, x, y);
    }

    /// Fill a rounded rectangle with alpha blending
    pub fn fill_rounded_rect(&mut self, rect: &RoundedRect, color: Rgba<u8>) {
        self.fill_where(rect.x, rect.y, rect.right(), rect.bottom(), color, |px, py| {
            rect.contains(px, py)
        });
    }

    /// Fill a plain rectangle, keeping only the part inside `clip`
    pub fn fill_rect_clipped(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        clip: &RoundedRect,
        color: Rgba<u8>,
    ) {
        let (right, bottom) = (x + width, y + height);
        self.fill_where(x, y, right, bottom, color, |px, py| {
            px >= x && px < right && py >= y && py < bottom && clip.contains(px, py)
        });
    }

    /// Draw a single line of text, left-aligned at `x`, sitting on `baseline`
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text(
        &mut self,
        font: &BitmapFont,
        text: &str,
        x: f32,
        baseline: f32,
        font_size: f32,
        color: Rgba<u8>,
        clip: &RoundedRect,
    ) {
        let cell = font_size.round().max(1.0) as u32;
        let top = (baseline - font_size).round() as i64;
        let mut cursor_x = x.round() as i64;

        for ch in text.chars() {
            let glyph = font.glyph(ch);
            for gy in 0..cell {
                for gx in 0..cell {
                    if !font.covers(&glyph, gx, gy, cell) {
                        continue;
                    }
                    let tx = cursor_x + i64::from(gx);
                    let ty = top + i64::from(gy);
                    if tx < 0 || ty < 0 || tx >= i64::from(self.width()) || ty >= i64::from(self.height()) {
                        continue;
                    }
                    if !clip.contains(tx as f32 + 0.5, ty as f32 + 0.5) {
                        continue;
                    }
                    let dst = *self.canvas.get_pixel(tx as u32, ty as u32);
                    self.canvas.put_pixel(tx as u32, ty as u32, blend_pixel(dst, color));
                }
            }
            cursor_x += i64::from(cell);
        }
    }

    /// Current pixels
    pub fn snapshot(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Encode the snapshot as baseline JPEG at `quality` (1-100)
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CompositeError> {
        // JPEG has no alpha channel
        let rgb: RgbImage = self.canvas.convert();
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder
            .encode_image(&rgb)
            .map_err(CompositeError::EncodeFailed)?;
        Ok(bytes)
    }

    fn fill_where(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: Rgba<u8>,
        inside: impl Fn(f32, f32) -> bool,
    ) {
        let (w, h) = (self.width() as f32, self.height() as f32);
        let min_x = x0.floor().clamp(0.0, w) as u32;
        let max_x = x1.ceil().clamp(0.0, w) as u32;
        let min_y = y0.floor().clamp(0.0, h) as u32;
        let max_y = y1.ceil().clamp(0.0, h) as u32;

        for py in min_y..max_y {
            for px in min_x..max_x {
                if inside(px as f32 + 0.5, py as f32 + 0.5) {
                    let dst = *self.canvas.get_pixel(px, py);
                    self.canvas.put_pixel(px, py, blend_pixel(dst, color));
                }
            }
        }
    }
}
