/// Error types for the finishing pipeline
///
/// Each boundary gets its own enum:
/// - `CompositeError` - decode/draw/encode/write inside the compositor
/// - `StoreError` - calls into the album (asset store)
/// - `FinishError` - what the coordinator reports for one submission
/// - `ConfigError` - loading configuration and settings values

use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single compositor invocation
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("failed to decode source image {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to allocate a {width}x{height} raster surface")]
    SurfaceAllocationFailed { width: u32, height: u32 },

    #[error("failed to encode watermarked image: {0}")]
    EncodeFailed(#[source] image::ImageError),

    #[error("failed to write watermarked image to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures at the asset store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to save {path} to the album: {reason}")]
    SaveFailed { path: PathBuf, reason: String },

    #[error("failed to query the album: {0}")]
    QueryFailed(String),

    #[error("failed to delete assets: {0}")]
    DeleteFailed(String),
}

/// Outcome of a finishing submission that did not produce a photo
#[derive(Debug, Error)]
pub enum FinishError {
    #[error("finishing capacity reached ({limit} in flight), dropped {path}")]
    Dropped { path: PathBuf, limit: usize },

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("finishing task aborted: {0}")]
    TaskAborted(String),
}

/// Configuration and settings value errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid color value: {0:?}")]
    InvalidColor(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_message_names_path() {
        let err = FinishError::Dropped {
            path: PathBuf::from("/tmp/cap.jpg"),
            limit: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/cap.jpg"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_store_error_converts_into_finish_error() {
        let err: FinishError = StoreError::DeleteFailed("locked".into()).into();
        assert!(matches!(err, FinishError::Store(StoreError::DeleteFailed(_))));
    }
}
