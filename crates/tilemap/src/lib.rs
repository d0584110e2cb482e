//! # tilemap
//!
//! Document model, undo/redo engine and file formats for a 2D tilemap editor.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tilemap::prelude::*;
//!
//! let settings = EditorSettings::load();
//! let mut doc = Document::create("level", TileExtent::new(20, 15), &settings);
//! doc.execute(CreateLayer::new(LayerType::Tile, "ground"));
//! doc.save_as(Path::new("level.tmj"), SaveFormat::Tmj, &settings)?;
//! doc.undo();
//! ```
//!
//! ## Crate Structure
//!
//! - [`core`] - Maps, layers, tilesets, objects, properties and components
//! - [`io`] - TMX, TMJ and YAML readers and writers
//! - [`editor`] - Commands, documents, settings and tools
//!
//! ## Features
//!
//! - `bevy` - Derives `Resource` on the editor's document and settings

/// Core data types for tile maps.
pub mod core {
    pub use tilemap_core::*;
}

pub use tilemap_core::{
    Attribute, AttributeType, Color, ComponentDefinition, ComponentInstance, ComponentRegistry,
    GenericError, Layer, LayerType, Map, Metadata, Object, ObjectKind, TileExtent, TileFormat,
    TileId, TilePos, TileSize, Tileset, EMPTY_TILE,
};

/// Map file formats and the IR they share.
pub mod io {
    pub use tilemap_io::*;
}

pub use tilemap_io::{
    read_map, write_map, ImageTextureLoader, ReadOptions, SaveFormat, SaveFormatError,
    TextureLoader, TilesetStorage, WriteOptions,
};

/// Undo/redo commands, documents and editing tools.
pub mod editor {
    pub use tilemap_editor::*;
}

pub use tilemap_editor::{
    Command, CommandKind, CommandStack, Document, EditorContext, EditorSettings, MapCommand,
    MapDocument, StampMode, StampTool, Strings,
};

/// Commonly used types and traits.
///
/// Import with:
/// ```rust,ignore
/// use tilemap::prelude::*;
/// ```
pub mod prelude {
    // Model
    pub use crate::{
        Attribute, AttributeType, ComponentRegistry, Layer, LayerType, Map, Metadata, Object,
        ObjectKind, TileExtent, TileId, TilePos, TileSize, Tileset, EMPTY_TILE,
    };

    // Files
    pub use crate::{ImageTextureLoader, ReadOptions, SaveFormat, SaveFormatError, WriteOptions};

    // Editing
    pub use crate::{
        Command, Document, EditorContext, EditorSettings, MapDocument, StampMode, StampTool,
    };
    pub use tilemap_editor::commands::*;
}
