//! Core document model for the tilemap editor
//!
//! This crate provides the data types every other crate builds on:
//! - `Attribute` - Typed property and component values
//! - `Metadata` - Name, id, properties and components of an entity
//! - `ComponentRegistry` - Document-wide component schemas
//! - `Layer` - Tile, object and group layers forming a tree
//! - `Tileset` / `AttachedTileset` - Tile atlases and their id ranges in a map
//! - `Map` - The complete map with its layer tree and tilesets

mod attribute;
mod color;
mod component;
mod error;
mod geometry;
mod layer;
mod map;
mod metadata;
mod object;
mod tileset;

pub use attribute::{Attribute, AttributeType, ObjectRef, UnknownAttributeType};
pub use color::{Color, ColorFormat, ColorParseError};
pub use component::{ComponentDefinition, ComponentInstance, ComponentRegistry};
pub use error::GenericError;
pub use geometry::{TileExtent, TileId, TilePos, TileSize, Vec2, EMPTY_TILE};
pub use layer::{GroupLayer, Layer, LayerKind, LayerType, ObjectLayer, TileLayer};
pub use map::{CompressionMode, Map, TileEncoding, TileFormat};
pub use metadata::Metadata;
pub use object::{Object, ObjectKind};
pub use tileset::{
    AnimationFrame, AttachedTileset, TextureRef, TileAnimation, TileDefinition, TileIndex,
    TileRegion, Tileset,
};

/// Result type for fallible model and utility operations
pub type Result<T> = std::result::Result<T, GenericError>;
