//! Format-neutral intermediate representation of a map file
//!
//! Readers build these trees from files, writers serialize them. Entities are
//! identified by the names and integer ids the file formats use; no uuids
//! appear here.

use std::path::PathBuf;
use tilemap_core::{Attribute, ObjectKind, TileFormat, TileId};

/// A named, typed value
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Attribute,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Attribute) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A component attached to an entity, referring to its definition by name
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub values: Vec<Property>,
}

/// A component schema with default values
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub name: String,
    pub attributes: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub id: i32,
    pub kind: ObjectKind,
    pub name: String,
    pub tag: String,
    pub visible: bool,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Tile {
        rows: usize,
        cols: usize,
        /// Row-major tile ids
        data: Vec<TileId>,
    },
    Object {
        objects: Vec<Object>,
    },
    Group {
        layers: Vec<Layer>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: i32,
    pub name: String,
    pub opacity: f32,
    pub visible: bool,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
    pub kind: LayerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub tile: i32,
    pub duration_ms: u32,
}

/// Per-tile data of a tileset
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: i32,
    pub animation: Vec<Frame>,
    pub objects: Vec<Object>,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    pub column_count: u32,
    pub image_path: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    pub tiles: Vec<Tile>,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

/// A tileset as referenced from a map
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetRef {
    pub first_tile_id: TileId,
    /// Stored inline rather than in its own file
    pub embedded: bool,
    pub tileset: Tileset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub rows: usize,
    pub cols: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_format: TileFormat,
    pub next_layer_id: i32,
    pub next_object_id: i32,
    pub component_definitions: Vec<ComponentDefinition>,
    pub tilesets: Vec<TilesetRef>,
    pub layers: Vec<Layer>,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Map {
    /// Whether any entity in the map carries component data
    pub fn has_components(&self) -> bool {
        fn objects_have(objects: &[Object]) -> bool {
            objects.iter().any(|o| !o.components.is_empty())
        }
        fn layers_have(layers: &[Layer]) -> bool {
            layers.iter().any(|layer| {
                !layer.components.is_empty()
                    || match &layer.kind {
                        LayerKind::Tile { .. } => false,
                        LayerKind::Object { objects } => objects_have(objects),
                        LayerKind::Group { layers } => layers_have(layers),
                    }
            })
        }

        !self.components.is_empty()
            || !self.component_definitions.is_empty()
            || layers_have(&self.layers)
            || self.tilesets.iter().any(|t| {
                !t.tileset.components.is_empty()
                    || t.tileset
                        .tiles
                        .iter()
                        .any(|tile| !tile.components.is_empty() || objects_have(&tile.objects))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_components_finds_nested_objects() {
        let object = Object {
            id: 1,
            kind: ObjectKind::Point,
            name: "spawn".into(),
            tag: String::new(),
            visible: true,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            properties: Vec::new(),
            components: vec![Component {
                name: "Spawner".into(),
                values: Vec::new(),
            }],
        };
        let group = Layer {
            id: 1,
            name: "group".into(),
            opacity: 1.0,
            visible: true,
            properties: Vec::new(),
            components: Vec::new(),
            kind: LayerKind::Group {
                layers: vec![Layer {
                    id: 2,
                    name: "objects".into(),
                    opacity: 1.0,
                    visible: true,
                    properties: Vec::new(),
                    components: Vec::new(),
                    kind: LayerKind::Object {
                        objects: vec![object],
                    },
                }],
            },
        };
        let mut map = Map {
            rows: 1,
            cols: 1,
            tile_width: 16,
            tile_height: 16,
            tile_format: TileFormat::default(),
            next_layer_id: 3,
            next_object_id: 2,
            component_definitions: Vec::new(),
            tilesets: Vec::new(),
            layers: Vec::new(),
            properties: Vec::new(),
            components: Vec::new(),
        };
        assert!(!map.has_components());
        map.layers.push(group);
        assert!(map.has_components());
    }
}
