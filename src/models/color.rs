// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Trace display colors.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An RGB display color, persisted as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);
    pub const GREEN: Color = Color::new(0x00, 0xff, 0x00);
    pub const BLUE: Color = Color::new(0x00, 0x00, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pick a uniformly random color.
    pub fn random() -> Self {
        let value: u32 = rand::thread_rng().gen_range(0..=0xff_ffff);
        Self::from_u32(value)
    }

    fn from_u32(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A color string that is neither `#rrggbb` nor a known color name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color `{}`", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() == 6 {
                if let Ok(value) = u32::from_str_radix(hex, 16) {
                    return Ok(Self::from_u32(value));
                }
            }
            return Err(ParseColorError(s.to_string()));
        }

        // Older documents stored Tk color names.
        match trimmed.to_ascii_lowercase().as_str() {
            "red" => Ok(Color::RED),
            "green" => Ok(Color::GREEN),
            "blue" => Ok(Color::BLUE),
            "black" => Ok(Color::new(0x00, 0x00, 0x00)),
            "white" => Ok(Color::new(0xff, 0xff, 0xff)),
            "yellow" => Ok(Color::new(0xff, 0xff, 0x00)),
            "orange" => Ok(Color::new(0xff, 0xa5, 0x00)),
            "purple" => Ok(Color::new(0x80, 0x00, 0x80)),
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_display() {
        let color: Color = "#1a2B3c".parse().unwrap();
        assert_eq!(color, Color::new(0x1a, 0x2b, 0x3c));
        assert_eq!(color.to_string(), "#1a2b3c");
    }

    #[test]
    fn test_parse_legacy_names() {
        assert_eq!("red".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("Blue".parse::<Color>().unwrap(), Color::BLUE);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
        assert!("mauve-ish".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::RED).unwrap();
        assert_eq!(json, "\"#ff0000\"");
        let back: Color = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(back, Color::RED);
    }
}
