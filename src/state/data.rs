/// Shared data structures for the finishing pipeline
///
/// These structs represent the data model that flows between
/// the album (asset store), the photo index, and the UI layer.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Id prefix reserved for optimistic placeholder photos
pub const TEMP_ID_PREFIX: &str = "temp-";

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A single photo in the album
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Unique id issued by the album, or `temp-...` for placeholders
    pub id: String,
    pub uri: String,
    /// Filename only (e.g., "WaterMark_1739812345000_0.jpg")
    pub filename: String,
    /// Milliseconds since the Unix epoch
    pub creation_time: i64,
}

impl Photo {
    /// Placeholder shown while a capture is still being finished
    pub fn optimistic(uri: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}{}-{}", TEMP_ID_PREFIX, now, seq),
            uri: uri.into(),
            filename: "capturing...".to_string(),
            creation_time: now,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

/// Opaque pagination token issued by the album
///
/// Callers hand it back unmodified; its contents mean nothing outside the
/// store that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Creation-time sort direction
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }

    pub fn is_ascending(self) -> bool {
        self == SortOrder::Ascending
    }
}

/// One page fetched from the album
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhotoPage {
    pub items: Vec<Photo>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
}

/// A location fix with its display strings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    /// e.g. "37.7749° N, 122.4194° W"
    pub formatted: String,
    /// Reverse-geocoded address, when the provider has one
    pub address: Option<String>,
}

impl LocationData {
    pub fn from_coordinates(latitude: f64, longitude: f64, address: Option<String>) -> Self {
        Self {
            latitude,
            longitude,
            formatted: format_coordinates(latitude, longitude),
            address: address.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Join reverse-geocode parts (city, region, country) into one line,
    /// skipping blanks and repeats
    pub fn compose_address<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
        let mut seen: Vec<&str> = Vec::new();
        for part in parts.into_iter().flatten().map(str::trim) {
            if !part.is_empty() && !seen.contains(&part) {
                seen.push(part);
            }
        }
        if seen.is_empty() {
            None
        } else {
            Some(seen.join(", "))
        }
    }
}

/// Format a coordinate pair as "12.3456° N, 65.4321° W"
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    let lat_dir = if latitude >= 0.0 { "N" } else { "S" };
    let lon_dir = if longitude >= 0.0 { "E" } else { "W" };
    format!(
        "{:.4}° {}, {:.4}° {}",
        latitude.abs(),
        lat_dir,
        longitude.abs(),
        lon_dir
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_ids_are_unique_and_marked() {
        let a = Photo::optimistic("file:///tmp/a.jpg");
        let b = Photo::optimistic("file:///tmp/b.jpg");
        assert!(a.is_optimistic());
        assert!(a.id.starts_with("temp-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.filename, "capturing...");
    }

    #[test]
    fn test_format_coordinates() {
        assert_eq!(
            format_coordinates(37.774929, -122.419416),
            "37.7749° N, 122.4194° W"
        );
        assert_eq!(format_coordinates(-33.8688, 151.2093), "33.8688° S, 151.2093° E");
    }

    #[test]
    fn test_compose_address_dedupes_and_skips_blanks() {
        let address = LocationData::compose_address([
            Some("Singapore"),
            None,
            Some("Singapore"),
            Some(""),
            Some("SG"),
        ]);
        assert_eq!(address.as_deref(), Some("Singapore, SG"));
        assert_eq!(LocationData::compose_address([None, Some(" ")]), None);
    }

    #[test]
    fn test_blank_address_is_dropped() {
        let loc = LocationData::from_coordinates(1.0, 2.0, Some("  ".into()));
        assert_eq!(loc.address, None);
        assert_eq!(loc.formatted, "1.0000° N, 2.0000° E");
    }
}
