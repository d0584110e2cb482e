//! Property value parsing shared by the text-based formats

use crate::error::{Result, SaveFormatError};
use std::path::PathBuf;
use tilemap_core::{Attribute, AttributeType, Color, ColorFormat, ColorParseError};

/// Map a type name to an attribute type
pub(crate) fn parse_type(name: &str) -> Result<AttributeType> {
    name.parse::<AttributeType>()
        .map_err(|_| SaveFormatError::UnsupportedPropertyType(name.to_string()))
}

/// Parse `#RRGGBB` or an 8-digit color in `long_format` channel order
pub(crate) fn parse_color(text: &str, long_format: ColorFormat) -> Result<Color> {
    Color::parse_short_or_long(text, long_format).map_err(|e| match e {
        ColorParseError::BadLength => SaveFormatError::CorruptPropertyValue,
        ColorParseError::BadDigit => SaveFormatError::BadColorProperty,
    })
}

/// Parse a value stored as text, as TMX and YAML scalars are
pub(crate) fn parse_text(
    ty: AttributeType,
    text: &str,
    long_color: ColorFormat,
) -> Result<Attribute> {
    Ok(match ty {
        AttributeType::String => Attribute::String(text.to_string()),
        AttributeType::Int => Attribute::Int(
            text.trim()
                .parse()
                .map_err(|_| SaveFormatError::CorruptPropertyValue)?,
        ),
        AttributeType::Float => Attribute::Float(
            text.trim()
                .parse()
                .map_err(|_| SaveFormatError::CorruptPropertyValue)?,
        ),
        AttributeType::Bool => match text.trim() {
            "true" => Attribute::Bool(true),
            "false" => Attribute::Bool(false),
            _ => return Err(SaveFormatError::CorruptPropertyValue),
        },
        AttributeType::Path => Attribute::Path(PathBuf::from(text)),
        AttributeType::Object => Attribute::Object(
            text.trim()
                .parse()
                .map_err(|_| SaveFormatError::CorruptPropertyValue)?,
        ),
        AttributeType::Color => Attribute::Color(parse_color(text.trim(), long_color)?),
    })
}

/// Text form of a value, the inverse of [`parse_text`]
pub(crate) fn to_text(value: &Attribute, long_color: ColorFormat) -> String {
    match value {
        Attribute::String(text) => text.clone(),
        Attribute::Int(v) => v.to_string(),
        Attribute::Float(v) => float_text(*v),
        Attribute::Bool(v) => v.to_string(),
        Attribute::Path(path) => path.to_string_lossy().replace('\\', "/"),
        Attribute::Object(v) => v.to_string(),
        Attribute::Color(color) => color.to_hex(long_color),
    }
}

/// Shortest text that parses back to the same `f32`
pub(crate) fn float_text(value: f32) -> String {
    format!("{}", value)
}
