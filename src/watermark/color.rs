/// Accent color values for the watermark border
///
/// Colors arrive from the settings layer as display strings
/// (`#FFD700`, `#FFD700CC`, `rgba(255, 215, 0, 0.8)`) and are parsed
/// once into an RGBA pixel before they reach the compositor.

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A parsed accent color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentColor(pub Rgba<u8>);

impl AccentColor {
    pub const GOLD: AccentColor = AccentColor(Rgba([0xFF, 0xD7, 0x00, 0xFF]));
    pub const RED: AccentColor = AccentColor(Rgba([0xFF, 0x44, 0x44, 0xFF]));
    pub const BLUE: AccentColor = AccentColor(Rgba([0x44, 0x44, 0xFF, 0xFF]));
    pub const WHITE: AccentColor = AccentColor(Rgba([0xFF, 0xFF, 0xFF, 0xFF]));
    pub const BLACK: AccentColor = AccentColor(Rgba([0x00, 0x00, 0x00, 0xFF]));

    /// Preset accents offered by the settings panel
    pub const PALETTE: [AccentColor; 5] = [
        Self::GOLD,
        Self::RED,
        Self::BLUE,
        Self::WHITE,
        Self::BLACK,
    ];

    pub fn rgba(&self) -> Rgba<u8> {
        self.0
    }

    /// Render as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.0 .0;
        if a == 0xFF {
            format!("#{:02X}{:02X}{:02X}", r, g, b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }
}

impl Default for AccentColor {
    fn default() -> Self {
        Self::GOLD
    }
}

impl FromStr for AccentColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
            .map(AccentColor)
            .ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for AccentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccentColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccentColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_color(raw: &str) -> Option<Rgba<u8>> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return match hex.len() {
            6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 0xFF])),
            8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
            _ => None,
        };
    }

    let lower = s.to_ascii_lowercase();
    let body = lower.strip_prefix("rgba(")?.strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        Some(p.parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8)
    };
    // Alpha is either a 0..1 fraction or a 0..255 byte
    let alpha = parts[3].parse::<f64>().ok()?;
    let a = if alpha <= 1.0 {
        (alpha * 255.0).round().clamp(0.0, 255.0) as u8
    } else {
        alpha.round().clamp(0.0, 255.0) as u8
    };
    Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, a]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let c: AccentColor = "#FFD700".parse().unwrap();
        assert_eq!(c, AccentColor::GOLD);

        let c: AccentColor = "#ff444480".parse().unwrap();
        assert_eq!(c.rgba(), Rgba([0xFF, 0x44, 0x44, 0x80]));
    }

    #[test]
    fn test_parse_rgba_function() {
        let c: AccentColor = "rgba(0, 0, 0, 0.4)".parse().unwrap();
        assert_eq!(c.rgba(), Rgba([0, 0, 0, 102]));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("gold".parse::<AccentColor>().is_err());
        assert!("#FFD7".parse::<AccentColor>().is_err());
        assert!("rgba(1, 2, 3)".parse::<AccentColor>().is_err());
    }

    #[test]
    fn test_rejects_signed_hex_channels() {
        assert!("#+F+F+F".parse::<AccentColor>().is_err());
        assert!("#FF-1FF".parse::<AccentColor>().is_err());
        assert!("#+F+F+F+F".parse::<AccentColor>().is_err());
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let json = serde_json::to_string(&AccentColor::BLUE).unwrap();
        assert_eq!(json, "\"#4444FF\"");
        let back: AccentColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccentColor::BLUE);
    }
}
