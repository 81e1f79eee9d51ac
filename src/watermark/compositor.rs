/// Watermark compositor
///
/// Decodes a captured photo, draws the metadata overlay on top of it,
/// encodes the result as JPEG and writes it to the cache directory.
/// The work is CPU-bound, so async callers go through `composite_async`,
/// which runs it on the blocking thread pool.

use image::{ImageError, ImageReader, Rgba};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::color::AccentColor;
use super::layout::{compute_layout, LayoutBox, LineRole, OverlayContent, REFERENCE_WIDTH};
use super::surface::{RoundedRect, Surface};
use super::text::BitmapFont;
use crate::config::FinisherConfig;
use crate::error::{CompositeError, FinishError};

/// Default brand line
pub const DEFAULT_BRAND_TEXT: &str = "Shot on WaterMark";

/// Default JPEG quality for watermarked output
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

const BOX_FILL: Rgba<u8> = Rgba([0, 0, 0, 102]);
const BRAND_PAINT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const META_PAINT: Rgba<u8> = Rgba([255, 255, 255, 204]);

/// Everything needed to watermark one capture
///
/// Built fresh for every submission; never shared between invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkRequest {
    pub source: PathBuf,
    /// Pre-formatted display date
    pub date: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub accent_color: AccentColor,
}

/// Draws overlays and writes the finished files
#[derive(Debug)]
pub struct Compositor {
    font: BitmapFont,
    brand_text: String,
    reference_width: f32,
    jpeg_quality: u8,
    output_dir: PathBuf,
    sequence: AtomicU64,
}

impl Compositor {
    /// Create a compositor writing into `output_dir` with default styling
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            font: BitmapFont::new(),
            brand_text: DEFAULT_BRAND_TEXT.to_string(),
            reference_width: REFERENCE_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output_dir: output_dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &FinisherConfig) -> Self {
        Self {
            brand_text: config.brand_text.clone(),
            reference_width: config.reference_width,
            jpeg_quality: config.jpeg_quality,
            ..Self::new(config.cache_dir.clone())
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Overlay geometry for a request on an image of the given size
    pub fn layout_for(&self, width: u32, height: u32, request: &WatermarkRequest) -> LayoutBox {
        let content = OverlayContent {
            brand: &self.brand_text,
            date: &request.date,
            location: request.location.as_deref(),
            address: request.address.as_deref(),
        };
        compute_layout(width, height, &content, &self.font, self.reference_width)
    }

    /// Watermark one capture and return the path of the written JPEG
    pub fn composite(&self, request: &WatermarkRequest) -> Result<PathBuf, CompositeError> {
        let source = decode_source(&request.source)?;
        let (width, height) = (source.width(), source.height());
        log::debug!("🖼️  Decoded {}x{} from {}", width, height, request.source.display());

        let layout = self.layout_for(width, height, request);

        let mut surface = Surface::allocate(width, height)?;
        self.render(&mut surface, &source, &layout, request.accent_color);

        let bytes = surface.encode_jpeg(self.jpeg_quality)?;
        let output_path = self.write_output(&bytes)?;

        log::info!("💧 Watermarked {} -> {}", request.source.display(), output_path.display());
        Ok(output_path)
    }

    /// Run `composite` on the blocking pool
    pub async fn composite_async(
        self: Arc<Self>,
        request: WatermarkRequest,
    ) -> Result<PathBuf, FinishError> {
        tokio::task::spawn_blocking(move || self.composite(&request))
            .await
            .map_err(|e| FinishError::TaskAborted(e.to_string()))?
            .map_err(FinishError::from)
    }

    fn render(
        &self,
        surface: &mut Surface,
        source: &image::RgbaImage,
        layout: &LayoutBox,
        accent: AccentColor,
    ) {
        surface.draw_image(source, 0, 0);

        let frame = RoundedRect {
            x: layout.x,
            y: layout.y,
            width: layout.width,
            height: layout.height,
            radius: layout.corner_radius,
        };
        surface.fill_rounded_rect(&frame, BOX_FILL);

        // Accent strip shares the frame's rounded corners
        surface.fill_rect_clipped(
            layout.x,
            layout.y,
            layout.accent_width,
            layout.height,
            &frame,
            accent.rgba(),
        );

        for line in &layout.lines {
            let paint = match line.role {
                LineRole::Brand => BRAND_PAINT,
                LineRole::Meta => META_PAINT,
            };
            surface.draw_text(
                &self.font,
                &line.content,
                layout.text_x,
                line.baseline_y,
                line.font_size,
                paint,
                &frame,
            );
        }
    }

    fn write_output(&self, bytes: &[u8]) -> Result<PathBuf, CompositeError> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.output_dir.join(format!("watermark_{}_{}.jpg", millis, seq));

        fs::create_dir_all(&self.output_dir)
            .and_then(|_| fs::write(&path, bytes))
            .map_err(|source| CompositeError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

fn decode_source(path: &Path) -> Result<image::RgbaImage, CompositeError> {
    let failed = |source: ImageError| CompositeError::DecodeFailed {
        path: path.to_path_buf(),
        source,
    };

    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| failed(ImageError::IoError(e)))?
        .decode()
        .map_err(failed)?;

    Ok(image.to_rgba8())
}
