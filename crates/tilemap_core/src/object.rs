//! Free-placed objects living in object layers and tile definitions

use crate::geometry::Vec2;
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Point,
    #[default]
    Rect,
    Ellipse,
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Point => "point",
            ObjectKind::Rect => "rect",
            ObjectKind::Ellipse => "ellipse",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(ObjectKind::Point),
            "rect" => Ok(ObjectKind::Rect),
            "ellipse" => Ok(ObjectKind::Ellipse),
            other => Err(format!("unknown object type '{}'", other)),
        }
    }
}

/// A point, rectangle or ellipse placed in pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub metadata: Metadata,
    pub kind: ObjectKind,
    pub position: Vec2,
    /// Ignored for points
    pub size: Vec2,
    pub tag: String,
    pub persistent_id: Option<i32>,
    pub visible: bool,
}

impl Object {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(name),
            kind,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            tag: String::new(),
            persistent_id: None,
            visible: true,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether a pixel position falls inside the object's bounds
    pub fn contains(&self, point: Vec2) -> bool {
        match self.kind {
            ObjectKind::Point => point == self.position,
            ObjectKind::Rect => {
                point.x >= self.position.x
                    && point.y >= self.position.y
                    && point.x <= self.position.x + self.size.x
                    && point.y <= self.position.y + self.size.y
            }
            ObjectKind::Ellipse => {
                let rx = self.size.x / 2.0;
                let ry = self.size.y / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - (self.position.x + rx)) / rx;
                let dy = (point.y - (self.position.y + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("ellipse".parse::<ObjectKind>(), Ok(ObjectKind::Ellipse));
        assert!("polygon".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn test_contains() {
        let rect = Object::new(ObjectKind::Rect, "door")
            .with_position(Vec2::new(10.0, 10.0))
            .with_size(Vec2::new(20.0, 10.0));
        assert!(rect.contains(Vec2::new(15.0, 15.0)));
        assert!(!rect.contains(Vec2::new(31.0, 15.0)));

        let ellipse = Object::new(ObjectKind::Ellipse, "pond")
            .with_size(Vec2::new(10.0, 10.0));
        assert!(ellipse.contains(Vec2::new(5.0, 5.0)));
        assert!(!ellipse.contains(Vec2::new(0.0, 0.0)));
    }
}
