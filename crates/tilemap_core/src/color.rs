//! RGBA colors and their hex string encodings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel order used when parsing or formatting hex color strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// `#RRGGBB`, alpha is implicitly opaque
    Rgb,
    /// `#RRGGBBAA`
    Rgba,
    /// `#AARRGGBB`, used by Tiled
    Argb,
}

/// Reasons a hex color string can be rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorParseError {
    /// Missing `#` prefix or a digit count other than the format expects
    BadLength,
    /// A character that is not a hexadecimal digit
    BadDigit,
}

/// An 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    /// Create an opaque color
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 0xFF,
        }
    }

    /// Create a color with an explicit alpha channel
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Parse a `#`-prefixed hex string in the given channel order
    pub fn parse(text: &str, format: ColorFormat) -> Result<Self, ColorParseError> {
        let digits = text.strip_prefix('#').ok_or(ColorParseError::BadLength)?;
        let expected = match format {
            ColorFormat::Rgb => 6,
            ColorFormat::Rgba | ColorFormat::Argb => 8,
        };
        if digits.len() != expected || !digits.is_ascii() {
            return Err(ColorParseError::BadLength);
        }

        let mut bytes = [0xFFu8; 4];
        for (index, byte) in bytes.iter_mut().take(expected / 2).enumerate() {
            let pair = &digits[index * 2..index * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| ColorParseError::BadDigit)?;
        }

        Ok(match format {
            ColorFormat::Rgb | ColorFormat::Rgba => {
                Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3])
            }
            ColorFormat::Argb => Color::rgba(bytes[1], bytes[2], bytes[3], bytes[0]),
        })
    }

    /// Parse either `#RRGGBB` or an 8-digit string, where 8 digits use `long_format`
    pub fn parse_short_or_long(
        text: &str,
        long_format: ColorFormat,
    ) -> Result<Self, ColorParseError> {
        match text.strip_prefix('#').map(str::len) {
            Some(6) => Color::parse(text, ColorFormat::Rgb),
            Some(8) => Color::parse(text, long_format),
            _ => Err(ColorParseError::BadLength),
        }
    }

    /// Format as an uppercase hex string in the given channel order
    pub fn to_hex(&self, format: ColorFormat) -> String {
        match format {
            ColorFormat::Rgb => format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue),
            ColorFormat::Rgba => format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                self.red, self.green, self.blue, self.alpha
            ),
            ColorFormat::Argb => format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                self.alpha, self.red, self.green, self.blue
            ),
        }
    }

    /// Normalized channels in `[0, 1]`, handy for renderers
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            f32::from(self.red) / 255.0,
            f32::from(self.green) / 255.0,
            f32::from(self.blue) / 255.0,
            f32::from(self.alpha) / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex(ColorFormat::Rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOT_PINK: Color = Color::rgb(0xFF, 0x69, 0xB4);

    #[test]
    fn test_to_hex() {
        let color = Color::rgba(0x1A, 0x2B, 0x3C, 0x4D);
        assert_eq!(color.to_hex(ColorFormat::Rgb), "#1A2B3C");
        assert_eq!(color.to_hex(ColorFormat::Rgba), "#1A2B3C4D");
        assert_eq!(color.to_hex(ColorFormat::Argb), "#4D1A2B3C");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            Color::parse("", ColorFormat::Rgb),
            Err(ColorParseError::BadLength)
        );
        assert_eq!(
            Color::parse("000000", ColorFormat::Rgb),
            Err(ColorParseError::BadLength)
        );
        assert_eq!(
            Color::parse("#0000000", ColorFormat::Rgb),
            Err(ColorParseError::BadLength)
        );
        assert_eq!(
            Color::parse("#G00000", ColorFormat::Rgb),
            Err(ColorParseError::BadDigit)
        );
        assert_eq!(
            Color::parse("#000000G0", ColorFormat::Argb),
            Err(ColorParseError::BadDigit)
        );
    }

    #[test]
    fn test_parse_channel_orders() {
        assert_eq!(Color::parse("#FF69B4", ColorFormat::Rgb), Ok(HOT_PINK));
        assert_eq!(Color::parse("#FF69B4FF", ColorFormat::Rgba), Ok(HOT_PINK));
        assert_eq!(Color::parse("#FFFF69B4", ColorFormat::Argb), Ok(HOT_PINK));
        assert_eq!(
            Color::parse("#FF0000FF", ColorFormat::Argb),
            Ok(Color::rgba(0x00, 0x00, 0xFF, 0xFF))
        );
    }

    #[test]
    fn test_short_or_long() {
        assert_eq!(
            Color::parse_short_or_long("#FF69B4", ColorFormat::Argb),
            Ok(HOT_PINK)
        );
        assert_eq!(
            Color::parse_short_or_long("#ZZ", ColorFormat::Argb),
            Err(ColorParseError::BadLength)
        );
    }

    #[test]
    fn test_round_trip() {
        for format in [ColorFormat::Rgb, ColorFormat::Rgba, ColorFormat::Argb] {
            assert_eq!(Color::parse(&HOT_PINK.to_hex(format), format), Ok(HOT_PINK));
        }
    }
}
