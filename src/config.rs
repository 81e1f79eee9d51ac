/// Runtime configuration
///
/// Loaded from a JSON file when one exists, otherwise built from
/// defaults. Platform directories come from the `dirs` crate:
/// - Linux: ~/.cache/photo-finisher/watermarked, ~/.local/share/photo-finisher/
/// - macOS: ~/Library/Caches/photo-finisher/..., ~/Library/Application Support/photo-finisher/
/// - Windows: %LOCALAPPDATA%\photo-finisher\..., %APPDATA%\photo-finisher\

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::watermark::compositor::{DEFAULT_BRAND_TEXT, DEFAULT_JPEG_QUALITY};
use crate::watermark::layout::REFERENCE_WIDTH;

const APP_DIR: &str = "photo-finisher";
const CONFIG_FILE: &str = "config.json";

/// Maximum number of captures finished at once
pub const MAX_CONCURRENT: usize = 3;

/// Photos fetched per index page
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FinisherConfig {
    /// First line of every watermark
    pub brand_text: String,
    /// Design width the overlay constants are expressed in
    pub reference_width: f32,
    /// JPEG quality (1-100) of watermarked output
    pub jpeg_quality: u8,
    /// Submissions above this many in flight are dropped
    pub max_concurrent: usize,
    pub page_size: usize,
    /// chrono format string for the date line
    pub date_format: String,
    /// Save the untouched capture when watermarking fails
    pub fallback_to_original: bool,
    /// Where watermarked files are written
    pub cache_dir: PathBuf,
    /// Where the album keeps its copies of saved photos
    pub album_dir: PathBuf,
    /// Album catalog database
    pub db_path: PathBuf,
}

impl Default for FinisherConfig {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            brand_text: DEFAULT_BRAND_TEXT.to_string(),
            reference_width: REFERENCE_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_concurrent: MAX_CONCURRENT,
            page_size: DEFAULT_PAGE_SIZE,
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            fallback_to_original: true,
            cache_dir: app_cache_dir().join("watermarked"),
            album_dir: data_dir.join("album"),
            db_path: data_dir.join("album.db"),
        }
    }
}

impl FinisherConfig {
    /// Load configuration
    ///
    /// Search order:
    /// 1. Explicit path if provided (must exist)
    /// 2. `<config_dir>/photo-finisher/config.json`
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            log::info!("📝 Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            log::info!("📝 Loading configuration from {}", path.display());
            return Self::from_file(&path);
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a JSON configuration file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configuration rooted in one directory (tests, portable installs)
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            cache_dir: root.join("watermarked"),
            album_dir: root.join("album"),
            db_path: root.join("album.db"),
            ..Self::default()
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn app_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}
