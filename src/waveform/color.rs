//! Colors accepted by the waveform surface and the configuration file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fill color: either fully transparent or an opaque RGB triple.
///
/// Parsed from `"transparent"`, `"#RRGGBB"` or the short `"#RGB"` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    Transparent,
    Rgb(u8, u8, u8),
}

impl Color {
    pub const WHITE: Color = Color::Rgb(0xFF, 0xFF, 0xFF);

    pub fn is_transparent(&self) -> bool {
        matches!(self, Color::Transparent)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Color::Transparent);
        }

        let invalid =
            || format!("invalid color '{s}': expected '#RRGGBB', '#RGB' or 'transparent'");
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }

        // #abc expands to #aabbcc
        let full = match hex.len() {
            3 => format!("#{}", hex.chars().flat_map(|c| [c, c]).collect::<String>()),
            6 => s.to_string(),
            _ => return Err(invalid()),
        };

        match full.parse::<ratatui::style::Color>() {
            Ok(ratatui::style::Color::Rgb(r, g, b)) => Ok(Color::Rgb(r, g, b)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Transparent => write!(f, "transparent"),
            Color::Rgb(r, g, b) => write!(f, "#{r:02X}{g:02X}{b:02X}"),
        }
    }
}

impl From<Color> for ratatui::style::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::Transparent => ratatui::style::Color::Reset,
            Color::Rgb(r, g, b) => ratatui::style::Color::Rgb(r, g, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#5e5e5e".parse::<Color>(), Ok(Color::Rgb(0x5E, 0x5E, 0x5E)));
        assert_eq!("#fff".parse::<Color>(), Ok(Color::WHITE));
        assert_eq!("Transparent".parse::<Color>(), Ok(Color::Transparent));
    }

    #[test]
    fn test_rejects_malformed_colors() {
        assert!("5e5e5e".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
        assert!("red".parse::<Color>().is_err());
        assert!("#ééé".parse::<Color>().is_err());
    }

    #[test]
    fn test_display_is_parseable() {
        let color = Color::Rgb(1, 2, 3);
        assert_eq!(color.to_string(), "#010203");
        assert_eq!(color.to_string().parse::<Color>(), Ok(color));
    }
}
