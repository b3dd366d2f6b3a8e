//! 24-bit RGB colors as used by the matrix palette.
//!
//! Configuration accepts either a TOML integer (`0xFF0000`) or a string in
//! `#RRGGBB`, `0xRRGGBB` or bare `RRGGBB` form.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::errors::SmxError;

/// Packed `0xRRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Self = Self(0x00_00_00);
    pub const WHITE: Self = Self(0xFF_FF_FF);
    pub const RED: Self = Self(0xFF_00_00);
    pub const YELLOW: Self = Self(0xFF_FF_00);
    pub const GREEN: Self = Self(0x00_FF_00);

    /// Largest packed value a color can hold.
    pub const MAX: u32 = 0xFF_FF_FF;

    /// Build a color from a packed value, rejecting anything above `0xFFFFFF`.
    #[must_use]
    pub const fn new(packed: u32) -> Option<Self> {
        if packed > Self::MAX {
            None
        } else {
            Some(Self(packed))
        }
    }

    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Split into `(r, g, b)` channels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

impl FromStr for Color {
    type Err = SmxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SmxError::ConfigParse {
                context: "color",
                details: format!("{raw:?} is not a 6-digit hex color"),
            });
        }
        u32::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|error| SmxError::ConfigParse {
                context: "color",
                details: format!("{raw:?}: {error}"),
            })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ColorVisitor)
    }
}

struct ColorVisitor;

impl Visitor<'_> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RGB color as an integer (0xRRGGBB) or a \"#RRGGBB\" string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Color, E> {
        u32::try_from(value)
            .ok()
            .and_then(Color::new)
            .ok_or_else(|| E::custom(format!("color {value:#x} exceeds 0xFFFFFF")))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Color, E> {
        let unsigned =
            u64::try_from(value).map_err(|_| E::custom(format!("color {value} is negative")))?;
        self.visit_u64(unsigned)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Color, E> {
        value.parse().map_err(E::custom)
    }
}
