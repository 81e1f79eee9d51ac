/// Text metrics and glyph coverage for watermark text
///
/// The layout engine only needs widths and heights, so it talks to the
/// `TextMetrics` trait. `BitmapFont` is the built-in provider: the 8x8
/// `font8x8` glyphs scaled up to the requested font size.

use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, LATIN_FONTS};

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Rendered size of a string in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Measures strings for a given font size (in pixels)
pub trait TextMetrics: Send + Sync {
    fn measure(&self, text: &str, font_size: f32) -> TextExtent;
}

/// Square-cell bitmap font; advance and cell size equal the font size
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    pub fn new() -> Self {
        Self
    }

    /// 8x8 bitmap for a character, falling back to `?`
    pub fn glyph(&self, ch: char) -> [u8; 8] {
        BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| GREEK_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }

    /// Whether the pixel at (`px`, `py`) inside a `cell`-sized glyph cell is inked
    pub fn covers(&self, glyph: &[u8; 8], px: u32, py: u32, cell: u32) -> bool {
        if cell == 0 || px >= cell || py >= cell {
            return false;
        }
        let row = (py * 8 / cell) as usize;
        let col = px * 8 / cell;
        (glyph[row] >> col) & 1 == 1
    }
}

impl TextMetrics for BitmapFont {
    fn measure(&self, text: &str, font_size: f32) -> TextExtent {
        TextExtent {
            width: text.chars().count() as f32 * font_size,
            height: font_size * LINE_HEIGHT_FACTOR,
        }
    }
}
