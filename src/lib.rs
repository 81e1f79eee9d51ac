//! Finishing pipeline for a capture app.
//!
//! A captured photo is handed to the [`FinishingCoordinator`], which stamps
//! a metadata watermark onto it in the background, saves it to the
//! [`Album`], and refreshes the [`PhotoIndex`] the gallery pages through.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod watermark;

pub use config::FinisherConfig;
pub use error::{CompositeError, ConfigError, FinishError, StoreError};
pub use pipeline::{Diagnostics, FinishingCoordinator};
pub use state::data::{Cursor, LocationData, Photo, PhotoPage, SortOrder};
pub use state::index::PhotoIndex;
pub use state::library::{Album, AssetStore};
pub use state::settings::{LiveSettings, SettingsPublisher, WatermarkSettings};
pub use watermark::{AccentColor, Compositor, WatermarkRequest};
