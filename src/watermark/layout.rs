/// Watermark layout engine
///
/// Computes the overlay geometry in image pixels. All design constants
/// are expressed for a 400px-wide reference frame and multiplied by
/// `scale = image_width / reference_width`, so the overlay keeps the same
/// proportions from a 1 MP phone shot to a 50 MP sensor.
///
/// The result is a pure function of the image size, the strings, and the
/// text metrics: identical inputs always give identical geometry.

use super::text::TextMetrics;

/// Width of the design frame the constants below are expressed in
pub const REFERENCE_WIDTH: f32 = 400.0;

const EDGE_MARGIN: f32 = 20.0;
const BOTTOM_MARGIN: f32 = 20.0;
const PADDING_V: f32 = 8.0;
const PADDING_H: f32 = 12.0;
const CORNER_RADIUS: f32 = 8.0;
const ACCENT_BORDER_WIDTH: f32 = 3.0;
const BRAND_FONT_SIZE: f32 = 16.0;
const META_FONT_SIZE: f32 = 10.0;

/// What a text line carries; decides its paint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Brand,
    Meta,
}

/// One laid-out line of overlay text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub content: String,
    pub role: LineRole,
    pub baseline_y: f32,
    pub font_size: f32,
    pub width: f32,
    pub height: f32,
}

/// Strings shown in the overlay
#[derive(Debug, Clone, Copy)]
pub struct OverlayContent<'a> {
    pub brand: &'a str,
    pub date: &'a str,
    pub location: Option<&'a str>,
    pub address: Option<&'a str>,
}

/// Overlay box geometry in image pixels
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub corner_radius: f32,
    pub accent_width: f32,
    /// Left edge shared by every text line
    pub text_x: f32,
    pub lines: Vec<TextLine>,
}

/// Lay out the overlay for a `image_width` x `image_height` image.
///
/// The box is anchored bottom-left. If the content would not fit, the
/// box is clamped to the image and the text is clipped by the compositor.
pub fn compute_layout(
    image_width: u32,
    image_height: u32,
    content: &OverlayContent<'_>,
    metrics: &dyn TextMetrics,
    reference_width: f32,
) -> LayoutBox {
    let (w, h) = (image_width as f32, image_height as f32);
    let scale = w / reference_width.max(1.0);

    let brand_size = BRAND_FONT_SIZE * scale;
    let meta_size = META_FONT_SIZE * scale;

    let mut entries: Vec<(&str, LineRole, f32)> = vec![
        (content.brand, LineRole::Brand, brand_size),
        (content.date, LineRole::Meta, meta_size),
    ];
    for optional in [content.location, content.address] {
        if let Some(text) = optional.filter(|t| !t.trim().is_empty()) {
            entries.push((text, LineRole::Meta, meta_size));
        }
    }

    let measured: Vec<_> = entries
        .into_iter()
        .map(|(text, role, size)| (text, role, size, metrics.measure(text, size)))
        .collect();

    let padding_v = PADDING_V * scale;
    let padding_h = PADDING_H * scale;
    let accent_width = ACCENT_BORDER_WIDTH * scale;
    let margin = EDGE_MARGIN * scale;
    let bottom_margin = BOTTOM_MARGIN * scale;

    let max_text_width = measured
        .iter()
        .map(|(_, _, _, extent)| extent.width)
        .fold(0.0_f32, f32::max);
    let content_height: f32 = measured.iter().map(|(_, _, _, extent)| extent.height).sum();

    let natural_width = max_text_width + padding_h * 2.0 + accent_width;
    let natural_height = content_height + padding_v * 2.0;

    let width = natural_width.min((w - margin * 2.0).max(0.0));
    let height = natural_height.min(h);
    let x = margin.min(w - width).max(0.0);
    let y = (h - bottom_margin - height).max(0.0);

    let mut line_top = y + padding_v;
    let lines = measured
        .into_iter()
        .map(|(text, role, size, extent)| {
            let line = TextLine {
                content: text.to_string(),
                role,
                baseline_y: line_top + size,
                font_size: size,
                width: extent.width,
                height: extent.height,
            };
            line_top += extent.height;
            line
        })
        .collect();

    LayoutBox {
        x,
        y,
        width,
        height,
        scale,
        corner_radius: CORNER_RADIUS * scale,
        accent_width,
        text_x: x + accent_width + padding_h,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::text::BitmapFont;

    fn content<'a>(location: Option<&'a str>, address: Option<&'a str>) -> OverlayContent<'a> {
        OverlayContent {
            brand: "Shot on WaterMark",
            date: "2026-10-18 09:41:00",
            location,
            address,
        }
    }

    #[test]
    fn test_geometry_scales_linearly_and_stays_in_bounds() {
        let font = BitmapFont::new();
        let c = content(Some("37.7749° N, 122.4194° W"), Some("San Francisco, CA, USA"));
        let base = compute_layout(400, 300, &c, &font, REFERENCE_WIDTH);

        for w in (480..=8000).step_by(352) {
            let h = w * 3 / 4;
            let layout = compute_layout(w, h, &c, &font, REFERENCE_WIDTH);
            let s = w as f32 / REFERENCE_WIDTH;

            assert!((layout.scale - s).abs() < 1e-4);
            assert!((layout.width / s - base.width).abs() < 1e-2, "width at {}", w);
            assert!((layout.height / s - base.height).abs() < 1e-2, "height at {}", w);

            assert!(layout.x >= 0.0 && layout.y >= 0.0);
            assert!(layout.x + layout.width <= w as f32);
            assert!(layout.y + layout.height <= h as f32);
        }
    }

    #[test]
    fn test_identical_inputs_give_identical_geometry() {
        let font = BitmapFont::new();
        let c = content(Some("1.0000° N, 2.0000° E"), None);
        let a = compute_layout(4032, 3024, &c, &font, REFERENCE_WIDTH);
        let b = compute_layout(4032, 3024, &c, &font, REFERENCE_WIDTH);
        assert_eq!(a, b);
    }

    #[test]
    fn test_brand_and_date_only_without_location() {
        let font = BitmapFont::new();
        let two = compute_layout(400, 300, &content(None, None), &font, REFERENCE_WIDTH);
        let four = compute_layout(
            400,
            300,
            &content(Some("1.0000° N, 2.0000° E"), Some("Paris, France")),
            &font,
            REFERENCE_WIDTH,
        );

        assert_eq!(two.lines.len(), 2);
        assert_eq!(two.lines[0].role, LineRole::Brand);
        assert_eq!(two.lines[1].role, LineRole::Meta);
        // brand 16*1.2 + date 10*1.2 + 2*8 padding
        assert!((two.height - (19.2 + 12.0 + 16.0)).abs() < 1e-3);
        assert_eq!(four.lines.len(), 4);
        assert!((four.height - two.height - 24.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_location_is_skipped() {
        let font = BitmapFont::new();
        let layout = compute_layout(400, 300, &content(Some(""), Some("  ")), &font, REFERENCE_WIDTH);
        assert_eq!(layout.lines.len(), 2);
    }

    #[test]
    fn test_anchor_bottom_left_and_baselines_increase() {
        let font = BitmapFont::new();
        let layout = compute_layout(800, 600, &content(Some("loc"), None), &font, REFERENCE_WIDTH);
        assert!((layout.x - 40.0).abs() < 1e-3);
        assert!((layout.y + layout.height - (600.0 - 40.0)).abs() < 1e-3);
        assert!((layout.text_x - (40.0 + 6.0 + 24.0)).abs() < 1e-3);
        assert!(layout.lines.windows(2).all(|p| p[0].baseline_y < p[1].baseline_y));
        assert!((layout.lines[0].baseline_y - (layout.y + 16.0 + 32.0)).abs() < 1e-3);
    }

    #[test]
    fn test_oversized_content_is_clamped_to_image() {
        let font = BitmapFont::new();
        let long = "x".repeat(200);
        let layout = compute_layout(480, 100, &content(Some(&long), Some(&long)), &font, REFERENCE_WIDTH);
        assert!(layout.x + layout.width <= 480.0);
        assert!(layout.y >= 0.0);
        assert!(layout.y + layout.height <= 100.0);
    }
}
