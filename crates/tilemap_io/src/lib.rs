//! Reading and writing tilemap documents
//!
//! Every format goes through a format-neutral IR ([`ir`]):
//! - Loading: a reader parses the file into IR, then [`map_from_ir`] builds the model
//! - Saving: [`map_to_ir`] flattens the model, then a writer renders the file
//!
//! Supported formats are Tiled XML (`.tmx`), Tiled JSON (`.tmj`) and the native
//! YAML format, selected with [`SaveFormat`].

pub mod compression;
mod convert;
mod error;
pub mod format;
mod fs;
pub mod ir;
mod options;
mod texture;
pub mod tile_codec;

pub use convert::{map_from_ir, map_to_ir};
pub use error::{Result, SaveFormatError};
pub use format::{OutputFile, SaveFormat};
pub use options::{ReadOptions, TilesetStorage, WriteOptions};
pub use texture::{resolve_textures, ImageTextureLoader, Texture, TextureLoader};

use std::path::Path;
use tilemap_core::{ComponentRegistry, Map};

/// Read a map file into a live model, named after the file stem
pub fn read_map(
    path: &Path,
    format: SaveFormat,
    options: &ReadOptions,
) -> Result<(Map, ComponentRegistry)> {
    let ir = format.parse_map(path, options)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    let loaded = map_from_ir(&ir, &name)?;
    tracing::info!("Loaded map {:?}", path);
    Ok(loaded)
}

/// Write a live model to `path`
pub fn write_map(
    map: &Map,
    components: &ComponentRegistry,
    path: &Path,
    format: SaveFormat,
    options: &WriteOptions,
) -> Result<()> {
    let ir = map_to_ir(map, components);
    format.emit_map(&ir, path, options)?;
    tracing::info!("Saved map {:?} as {:?}", path, format);
    Ok(())
}
