//! Typed property values shared by properties and component attributes

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifier of another object in the same map (its persistent id), `0` means none
pub type ObjectRef = i32;

/// The set of value types an [`Attribute`] can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Float,
    Bool,
    #[serde(rename = "file")]
    Path,
    #[serde(rename = "object")]
    Object,
    Color,
}

impl AttributeType {
    /// Every type, in the order editors list them
    pub const ALL: [AttributeType; 7] = [
        AttributeType::String,
        AttributeType::Int,
        AttributeType::Float,
        AttributeType::Bool,
        AttributeType::Path,
        AttributeType::Object,
        AttributeType::Color,
    ];

    /// Name used by every save format
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Bool => "bool",
            AttributeType::Path => "file",
            AttributeType::Object => "object",
            AttributeType::Color => "color",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a type name is not one of the known attribute types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAttributeType(pub String);

impl fmt::Display for UnknownAttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown attribute type '{}'", self.0)
    }
}

impl std::error::Error for UnknownAttributeType {}

impl FromStr for AttributeType {
    type Err = UnknownAttributeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeType::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| UnknownAttributeType(s.to_string()))
    }
}

/// A property or component attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Attribute {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
    #[serde(rename = "file")]
    Path(PathBuf),
    Object(ObjectRef),
    Color(Color),
}

impl Default for Attribute {
    fn default() -> Self {
        Attribute::String(String::new())
    }
}

impl Attribute {
    /// The default value for a type
    pub fn default_for(ty: AttributeType) -> Self {
        match ty {
            AttributeType::String => Attribute::String(String::new()),
            AttributeType::Int => Attribute::Int(0),
            AttributeType::Float => Attribute::Float(0.0),
            AttributeType::Bool => Attribute::Bool(false),
            AttributeType::Path => Attribute::Path(PathBuf::new()),
            AttributeType::Object => Attribute::Object(0),
            AttributeType::Color => Attribute::Color(Color::BLACK),
        }
    }

    pub fn get_type(&self) -> AttributeType {
        match self {
            Attribute::String(_) => AttributeType::String,
            Attribute::Int(_) => AttributeType::Int,
            Attribute::Float(_) => AttributeType::Float,
            Attribute::Bool(_) => AttributeType::Bool,
            Attribute::Path(_) => AttributeType::Path,
            Attribute::Object(_) => AttributeType::Object,
            Attribute::Color(_) => AttributeType::Color,
        }
    }

    /// Replace the value with the default of `ty`
    ///
    /// Does nothing if the attribute already has that type, so the current
    /// value survives a same-type "conversion".
    pub fn set_type(&mut self, ty: AttributeType) {
        if self.get_type() != ty {
            *self = Attribute::default_for(ty);
        }
    }

    /// Whether the value equals the default of its own type
    pub fn is_default(&self) -> bool {
        *self == Attribute::default_for(self.get_type())
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Attribute::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Attribute::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Attribute::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Attribute::Path(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Attribute::Object(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Attribute::Color(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::String(value)
    }
}

impl From<i32> for Attribute {
    fn from(value: i32) -> Self {
        Attribute::Int(value)
    }
}

impl From<f32> for Attribute {
    fn from(value: f32) -> Self {
        Attribute::Float(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Color> for Attribute {
    fn from(value: Color) -> Self {
        Attribute::Color(value)
    }
}
