/// Live watermark settings and location
///
/// The settings panel and the location subsystem each own a single
/// writer; every in-flight finishing task holds a reader. Readers go
/// through `tokio::sync::watch`, so a snapshot taken at dispatch time is
/// always the most recent write, never a copy frozen when the capture
/// was first requested.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::data::LocationData;
use crate::watermark::color::AccentColor;

/// User-facing watermark preferences
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WatermarkSettings {
    pub enabled: bool,
    pub accent_color: AccentColor,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            accent_color: AccentColor::default(),
        }
    }
}

impl WatermarkSettings {
    /// Convert to JSON string for the persistence layer
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a persisted JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Values read by a finishing task at dispatch time
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub watermark: WatermarkSettings,
    pub location: Option<LocationData>,
}

/// Writer side, owned by the settings and location subsystems
#[derive(Debug)]
pub struct SettingsPublisher {
    watermark: watch::Sender<WatermarkSettings>,
    location: watch::Sender<Option<LocationData>>,
}

impl SettingsPublisher {
    pub fn new(initial: WatermarkSettings) -> Self {
        let (watermark, _) = watch::channel(initial);
        let (location, _) = watch::channel(None);
        Self { watermark, location }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.watermark.send_modify(|s| s.enabled = enabled);
    }

    pub fn set_accent_color(&self, color: AccentColor) {
        self.watermark.send_modify(|s| s.accent_color = color);
    }

    pub fn replace(&self, settings: WatermarkSettings) {
        self.watermark.send_replace(settings);
    }

    /// Deliver a location update from the location subscription
    pub fn publish_location(&self, location: LocationData) {
        log::debug!("📍 Location update: {}", location.formatted);
        self.location.send_replace(Some(location));
    }

    /// Forget the current fix (permission revoked, provider stopped)
    pub fn clear_location(&self) {
        self.location.send_replace(None);
    }

    pub fn subscribe(&self) -> LiveSettings {
        LiveSettings {
            watermark: self.watermark.subscribe(),
            location: self.location.subscribe(),
        }
    }
}

impl Default for SettingsPublisher {
    fn default() -> Self {
        Self::new(WatermarkSettings::default())
    }
}

/// Reader side, cloned into each finishing task
#[derive(Debug, Clone)]
pub struct LiveSettings {
    watermark: watch::Receiver<WatermarkSettings>,
    location: watch::Receiver<Option<LocationData>>,
}

impl LiveSettings {
    /// Read the latest values right now
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            watermark: self.watermark.borrow().clone(),
            location: self.location.borrow().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_see_writes_made_after_subscribing() {
        let publisher = SettingsPublisher::default();
        let live = publisher.subscribe();
        let held_by_task = live.clone();

        assert!(held_by_task.snapshot().watermark.enabled);
        assert_eq!(held_by_task.snapshot().location, None);

        publisher.set_enabled(false);
        publisher.set_accent_color(AccentColor::RED);
        publisher.publish_location(LocationData::from_coordinates(48.8566, 2.3522, None));

        let snap = held_by_task.snapshot();
        assert!(!snap.watermark.enabled);
        assert_eq!(snap.watermark.accent_color, AccentColor::RED);
        assert_eq!(
            snap.location.map(|l| l.formatted).as_deref(),
            Some("48.8566° N, 2.3522° E")
        );

        publisher.clear_location();
        assert_eq!(live.snapshot().location, None);
    }

    #[test]
    fn test_settings_json_round_trip_and_defaults() {
        let settings = WatermarkSettings {
            enabled: false,
            accent_color: AccentColor::BLUE,
        };
        let restored = WatermarkSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(settings, restored);

        let partial = WatermarkSettings::from_json(r#"{ "enabled": false }"#).unwrap();
        assert_eq!(partial.accent_color, AccentColor::GOLD);
    }
}
