/// Watermark rendering module
///
/// This module handles:
/// - Parsing accent colors (color.rs)
/// - Measuring and rasterizing text (text.rs)
/// - The off-screen pixel buffer and its drawing primitives (surface.rs)
/// - Computing resolution-independent overlay geometry (layout.rs)
/// - Decoding, drawing, encoding and writing finished photos (compositor.rs)

pub mod color;
pub mod compositor;
pub mod layout;
pub mod surface;
pub mod text;

pub use color::AccentColor;
pub use compositor::{Compositor, WatermarkRequest};
pub use layout::{compute_layout, LayoutBox, TextLine};
