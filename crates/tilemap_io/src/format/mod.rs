//! Map file formats
//!
//! Each format module reads a file into an [`ir::Map`](crate::ir::Map) and
//! writes one back. Output is fully rendered in memory before any file is
//! touched; external tilesets are written before the map that refers to them.

mod property;
pub mod tmj;
pub mod tmx;
mod xml;
pub mod yaml;

use crate::error::Result;
use crate::fs;
use crate::ir;
use crate::options::{ReadOptions, WriteOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tilemap_core::TileFormat;

/// The supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum SaveFormat {
    /// Tiled XML
    Tmx,
    /// Tiled JSON
    Tmj,
    #[default]
    Yaml,
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 3] = [SaveFormat::Tmx, SaveFormat::Tmj, SaveFormat::Yaml];

    /// File extension of map files
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Tmx => "tmx",
            SaveFormat::Tmj => "tmj",
            SaveFormat::Yaml => "yaml",
        }
    }

    /// File extension of external tileset files
    pub fn tileset_extension(&self) -> &'static str {
        match self {
            SaveFormat::Tmx => "tsx",
            SaveFormat::Tmj => "tsj",
            SaveFormat::Yaml => "yaml",
        }
    }

    /// Whether the format can hold component definitions and instances
    pub fn supports_components(&self) -> bool {
        matches!(self, SaveFormat::Yaml)
    }

    /// Guess a format from a path's extension
    pub fn from_extension(path: &Path) -> Option<SaveFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tmx" => Some(SaveFormat::Tmx),
            "tmj" | "json" => Some(SaveFormat::Tmj),
            "yaml" | "yml" => Some(SaveFormat::Yaml),
            _ => None,
        }
    }

    /// Read a map file in this format
    pub fn parse_map(&self, path: &Path, options: &ReadOptions) -> Result<ir::Map> {
        tracing::debug!("Reading {:?} as {:?}", path, self);
        match self {
            SaveFormat::Tmx => tmx::parse_map(path, options),
            SaveFormat::Tmj => tmj::parse_map(path, options),
            SaveFormat::Yaml => yaml::parse_map(path, options),
        }
    }

    /// Write a map file (and any external tilesets) in this format
    pub fn emit_map(&self, map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<()> {
        tracing::debug!("Writing {:?} as {:?}", path, self);
        match self {
            SaveFormat::Tmx => tmx::emit_map(map, path, options),
            SaveFormat::Tmj => tmj::emit_map(map, path, options),
            SaveFormat::Yaml => yaml::emit_map(map, path, options),
        }
    }
}

/// A rendered file waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Write rendered files in order, each one atomically
pub(crate) fn write_files(files: &[OutputFile]) -> Result<()> {
    for file in files {
        fs::write_atomic(&file.path, file.contents.as_bytes())?;
        tracing::info!("Wrote {:?}", file.path);
    }
    Ok(())
}

/// Record the tile format of a tile layer; the first layer's format is the map's
pub(crate) fn note_tile_format(seen: &mut Option<TileFormat>, layer: &str, format: TileFormat) {
    match seen {
        None => *seen = Some(format),
        Some(first)
            if first.encoding != format.encoding || first.compression != format.compression =>
        {
            tracing::warn!(
                "Layer '{}' uses {:?}/{:?} but the map is saved as {:?}/{:?}",
                layer,
                format.encoding,
                format.compression,
                first.encoding,
                first.compression
            );
        }
        Some(_) => {}
    }
}

/// File names for external tilesets written next to one map
///
/// Every tileset gets its own file: names that clash with the map or with
/// an earlier tileset of the same save get a suffix.
pub(crate) struct TilesetFiles<'a> {
    map_path: &'a Path,
    extension: &'static str,
    taken: HashSet<String>,
}

impl<'a> TilesetFiles<'a> {
    pub(crate) fn new(map_path: &'a Path, extension: &'static str) -> Self {
        Self {
            map_path,
            extension,
            taken: HashSet::new(),
        }
    }

    /// Relative reference and full path for the tileset called `name`
    pub(crate) fn next(&mut self, name: &str) -> (String, PathBuf) {
        let stem: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        let mut stem = if stem.trim().is_empty() {
            "tileset".to_string()
        } else {
            stem
        };
        let dir = self.map_path.parent().map(Path::to_path_buf).unwrap_or_default();
        if dir.join(format!("{}.{}", stem, self.extension)) == self.map_path {
            // never overwrite the map itself
            stem.push_str(".tileset");
        }

        let mut file_name = format!("{}.{}", stem, self.extension);
        let mut suffix = 1;
        while !self.taken.insert(file_name.clone()) {
            suffix += 1;
            file_name = format!("{}-{}.{}", stem, suffix, self.extension);
        }
        if suffix > 1 {
            tracing::warn!(
                "Another tileset is already named '{}', writing it to {}",
                name,
                file_name
            );
        }
        let full = dir.join(&file_name);
        (file_name, full)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ir::*;
    use std::path::PathBuf;
    use tilemap_core::{Attribute, Color, CompressionMode, ObjectKind, TileEncoding, TileFormat};

    /// A map touching every feature the formats share
    pub fn sample_map(encoding: TileEncoding, compression: CompressionMode) -> Map {
        let spawn = Object {
            id: 1,
            kind: ObjectKind::Point,
            name: "spawn".into(),
            tag: "player".into(),
            visible: true,
            x: 16.0,
            y: 48.5,
            width: 0.0,
            height: 0.0,
            properties: vec![Property::new("facing", Attribute::from("left"))],
            components: Vec::new(),
        };
        let door = Object {
            id: 2,
            kind: ObjectKind::Rect,
            name: "door".into(),
            tag: String::new(),
            visible: false,
            x: 32.0,
            y: 0.0,
            width: 16.0,
            height: 32.0,
            properties: Vec::new(),
            components: Vec::new(),
        };
        let hitbox = Object {
            id: 3,
            kind: ObjectKind::Ellipse,
            name: "hitbox".into(),
            tag: String::new(),
            visible: true,
            x: 2.0,
            y: 2.0,
            width: 12.0,
            height: 12.0,
            properties: Vec::new(),
            components: Vec::new(),
        };
        Map {
            rows: 2,
            cols: 3,
            tile_width: 16,
            tile_height: 16,
            tile_format: TileFormat {
                encoding,
                compression,
                zlib_level: None,
                zstd_level: None,
            },
            next_layer_id: 5,
            next_object_id: 4,
            component_definitions: Vec::new(),
            tilesets: vec![TilesetRef {
                first_tile_id: 1,
                embedded: true,
                tileset: Tileset {
                    name: "terrain".into(),
                    tile_width: 16,
                    tile_height: 16,
                    tile_count: 8,
                    column_count: 4,
                    image_path: PathBuf::from("terrain.png"),
                    image_width: 64,
                    image_height: 32,
                    tiles: vec![Tile {
                        id: 2,
                        animation: vec![
                            Frame {
                                tile: 2,
                                duration_ms: 100,
                            },
                            Frame {
                                tile: 3,
                                duration_ms: 150,
                            },
                        ],
                        objects: vec![hitbox],
                        properties: vec![Property::new("solid", Attribute::Bool(true))],
                        components: Vec::new(),
                    }],
                    properties: vec![Property::new("biome", Attribute::from("grass"))],
                    components: Vec::new(),
                },
            }],
            layers: vec![
                Layer {
                    id: 1,
                    name: "ground".into(),
                    opacity: 0.75,
                    visible: true,
                    properties: vec![Property::new("z", Attribute::Int(-1))],
                    components: Vec::new(),
                    kind: LayerKind::Tile {
                        rows: 2,
                        cols: 3,
                        data: vec![1, 2, 0, 8, 3, 1],
                    },
                },
                Layer {
                    id: 2,
                    name: "group".into(),
                    opacity: 1.0,
                    visible: false,
                    properties: Vec::new(),
                    components: Vec::new(),
                    kind: LayerKind::Group {
                        layers: vec![Layer {
                            id: 3,
                            name: "things".into(),
                            opacity: 1.0,
                            visible: true,
                            properties: Vec::new(),
                            components: Vec::new(),
                            kind: LayerKind::Object {
                                objects: vec![spawn, door],
                            },
                        }],
                    },
                },
            ],
            properties: vec![
                Property::new("ambient", Attribute::Color(Color::rgba(0x10, 0x20, 0x30, 0x80))),
                Property::new("music", Attribute::Path(PathBuf::from("audio/theme.ogg"))),
                Property::new("gravity", Attribute::Float(9.81)),
                Property::new("boss", Attribute::Object(2)),
            ],
            components: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemap_core::{CompressionMode, TileEncoding};

    #[test]
    fn test_from_extension() {
        assert_eq!(
            SaveFormat::from_extension(Path::new("a/level.TMX")),
            Some(SaveFormat::Tmx)
        );
        assert_eq!(
            SaveFormat::from_extension(Path::new("level.yml")),
            Some(SaveFormat::Yaml)
        );
        assert_eq!(SaveFormat::from_extension(Path::new("level.png")), None);
        assert_eq!(SaveFormat::from_extension(Path::new("level")), None);
    }

    #[test]
    fn test_tileset_file_names() {
        let mut files = TilesetFiles::new(Path::new("maps/level.tmx"), "tsx");
        let (relative, full) = files.next("cave/walls");
        assert_eq!(relative, "cave_walls.tsx");
        assert_eq!(full, PathBuf::from("maps/cave_walls.tsx"));

        let mut files = TilesetFiles::new(Path::new("maps/level.yaml"), "yaml");
        assert_eq!(files.next("level").0, "level.tileset.yaml");
        assert_eq!(files.next("").0, "tileset.yaml");
    }

    #[test]
    fn test_same_named_tilesets_get_their_own_files() {
        let mut files = TilesetFiles::new(Path::new("level.tmj"), "tsj");
        assert_eq!(files.next("walls").0, "walls.tsj");
        assert_eq!(files.next("walls").0, "walls-2.tsj");
        assert_eq!(files.next("walls").0, "walls-3.tsj");
        assert_eq!(files.next("floor").0, "floor.tsj");
    }

    #[test]
    fn test_first_tile_format_wins() {
        let csv = TileFormat::default();
        let zstd = TileFormat {
            encoding: TileEncoding::Base64,
            compression: CompressionMode::Zstd,
            zlib_level: None,
            zstd_level: None,
        };
        let mut seen = None;
        note_tile_format(&mut seen, "ground", zstd);
        note_tile_format(&mut seen, "decor", csv);
        assert_eq!(seen, Some(zstd));
    }
}
