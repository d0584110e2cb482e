//! Open map documents and their undo history

use crate::commands::{CommandStack, MapCommand};
use crate::context::Strings;
use crate::settings::EditorSettings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tilemap_core::{ComponentRegistry, Map, TileExtent};
use tilemap_io::{ReadOptions, SaveFormat, SaveFormatError, Texture, TextureLoader};
use uuid::Uuid;

/// Everything a command can edit
#[derive(Debug, Clone, Default)]
pub struct MapDocument {
    pub map: Map,
    pub components: ComponentRegistry,
    /// File the document was last opened from or saved to
    pub path: Option<PathBuf>,
    pub format: SaveFormat,
}

impl MapDocument {
    pub fn new(map: Map) -> Self {
        Self {
            map,
            ..Default::default()
        }
    }
}

/// A map document with its command history and decoded tileset textures
#[derive(Debug)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct Document {
    pub data: MapDocument,
    pub history: CommandStack<MapCommand>,
    pub textures: HashMap<Uuid, Arc<Texture>>,
}

impl Document {
    pub fn new(data: MapDocument, settings: &EditorSettings) -> Self {
        Self {
            data,
            history: CommandStack::new(settings.command_capacity),
            textures: HashMap::new(),
        }
    }

    /// Start an empty map using the tile size, tile format and save format
    /// from the settings
    pub fn create(name: &str, extent: TileExtent, settings: &EditorSettings) -> Self {
        let mut map = Map::new(name, extent, settings.tile_size);
        map.tile_format = settings.tile_format;
        let data = MapDocument {
            map,
            format: settings.save_format,
            ..Default::default()
        };
        Self::new(data, settings)
    }

    /// Read a map file and load its tileset textures
    pub fn open(
        path: &Path,
        format: SaveFormat,
        options: &ReadOptions,
        loader: &mut dyn TextureLoader,
        settings: &EditorSettings,
    ) -> tilemap_io::Result<Self> {
        let (mut map, components) = tilemap_io::read_map(path, format, options)?;
        let base_dir = match &options.base_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let textures = tilemap_io::resolve_textures(&mut map, &base_dir, loader)?;

        let data = MapDocument {
            map,
            components,
            path: Some(path.to_path_buf()),
            format,
        };
        let mut document = Self::new(data, settings);
        document.textures = textures;
        Ok(document)
    }

    /// Write to the document's own path and format
    pub fn save(&mut self, settings: &EditorSettings) -> tilemap_io::Result<()> {
        let Some(path) = self.data.path.clone() else {
            tracing::error!("Document has no file yet, use save_as");
            return Err(SaveFormatError::InvalidOperation);
        };
        self.save_as(&path, self.data.format, settings)
    }

    /// Write the document to `path`, which becomes its file on success
    ///
    /// The history is marked clean only when the write succeeds.
    pub fn save_as(
        &mut self,
        path: &Path,
        format: SaveFormat,
        settings: &EditorSettings,
    ) -> tilemap_io::Result<()> {
        if !format.supports_components() && !self.data.components.is_empty() {
            tracing::warn!(
                "{:?} cannot store components, {} definitions will not be saved",
                format,
                self.data.components.len()
            );
        }
        tilemap_io::write_map(
            &self.data.map,
            &self.data.components,
            path,
            format,
            &settings.write_options(),
        )?;
        self.data.path = Some(path.to_path_buf());
        self.data.format = format;
        self.history.mark_as_clean();
        Ok(())
    }

    /// Load textures for tilesets that have none yet
    pub fn load_textures(&mut self, loader: &mut dyn TextureLoader) -> tilemap_io::Result<()> {
        let base_dir = self
            .data
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        for attached in self.data.map.tilesets() {
            let id = attached.id();
            if self.textures.contains_key(&id) {
                continue;
            }
            let texture = loader.load(&base_dir.join(&attached.tileset.texture.path))?;
            self.textures.insert(id, texture);
        }
        // drop textures of detached tilesets
        let map = &self.data.map;
        self.textures.retain(|id, _| map.tileset(*id).is_some());
        Ok(())
    }

    pub fn execute(&mut self, command: impl Into<MapCommand>) {
        self.history.push(&mut self.data, command.into());
    }

    pub fn undo(&mut self) {
        self.history.undo(&mut self.data);
    }

    pub fn redo(&mut self) {
        self.history.redo(&mut self.data);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        !self.history.is_clean()
    }

    /// Label of the command `undo` would revert
    pub fn undo_text<'a>(&self, strings: &'a Strings) -> Option<&'a str> {
        self.history
            .undo_kind()
            .map(|kind| strings.command_label(kind))
    }

    pub fn redo_text<'a>(&self, strings: &'a Strings) -> Option<&'a str> {
        self.history
            .redo_kind()
            .map(|kind| strings.command_label(kind))
    }

    /// Title for window or tab headers, with a marker for unsaved changes
    pub fn title(&self) -> String {
        let name = self.data.map.name();
        if self.is_dirty() {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddProperty, BucketFill, CreateLayer, CreateTileset};
    use tilemap_core::{Attribute, LayerType, TextureRef, TilePos, TileSize, Tileset};
    use tilemap_io::ImageTextureLoader;

    fn document() -> Document {
        Document::create("level", TileExtent::new(4, 4), &EditorSettings::default())
    }

    #[test]
    fn test_dirty_tracking() {
        let mut doc = document();
        assert!(!doc.is_dirty());
        assert_eq!(doc.title(), "level");

        doc.execute(CreateLayer::new(LayerType::Tile, "ground"));
        assert!(doc.is_dirty());
        assert_eq!(doc.title(), "level*");
        doc.undo();
        assert!(!doc.is_dirty());
        doc.redo();
        assert!(doc.is_dirty());
    }

    #[test]
    fn test_undo_text() {
        let mut doc = document();
        let mut strings = Strings::default();
        assert_eq!(doc.undo_text(&strings), None);

        doc.execute(CreateLayer::new(LayerType::Tile, "ground"));
        assert_eq!(doc.undo_text(&strings), Some("Create Layer"));
        strings.set(crate::commands::CommandKind::CreateLayer, "New Layer");
        assert_eq!(doc.undo_text(&strings), Some("New Layer"));

        doc.undo();
        assert_eq!(doc.undo_text(&strings), None);
        assert_eq!(doc.redo_text(&strings), Some("New Layer"));
    }

    #[test]
    fn test_capacity_from_settings() {
        let settings = EditorSettings {
            command_capacity: 3,
            ..Default::default()
        };
        let mut doc = Document::create("level", TileExtent::new(2, 2), &settings);
        for i in 0..4 {
            doc.execute(CreateLayer::new(LayerType::Tile, format!("layer {}", i)));
        }
        assert_eq!(doc.history.len(), 3);
        doc.undo();
        doc.undo();
        doc.undo();
        assert!(!doc.can_undo());
        assert_eq!(doc.data.map.layers().len(), 1);
    }

    #[test]
    fn test_save_marks_clean_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let image = image_path(dir.path());
        let settings = EditorSettings::default();

        let mut doc = document();
        doc.execute(CreateLayer::new(LayerType::Tile, "ground"));
        let ground = doc.data.map.active_layer.unwrap();
        let tileset = Tileset::new(
            "terrain",
            TextureRef {
                path: image.file_name().unwrap().into(),
                width: 32,
                height: 32,
            },
            TileSize::new(16, 16),
        );
        doc.execute(CreateTileset::new(tileset, true));
        doc.execute(BucketFill::new(ground, TilePos::new(0, 0), 3));
        let map_id = doc.data.map.metadata.id;
        doc.execute(AddProperty::with_value(map_id, "music", Attribute::from("cave.ogg")));

        let path = dir.path().join("level.tmj");
        doc.save_as(&path, SaveFormat::Tmj, &settings).unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(doc.data.path.as_deref(), Some(path.as_path()));

        let mut loader = ImageTextureLoader::new();
        let reopened =
            Document::open(&path, SaveFormat::Tmj, &ReadOptions::default(), &mut loader, &settings)
                .unwrap();
        assert!(!reopened.is_dirty());
        assert_eq!(reopened.textures.len(), 1);
        let layers = reopened.data.map.layers();
        assert_eq!(layers[0].as_tile().unwrap().get(TilePos::new(3, 3)), Some(3));
        assert_eq!(
            reopened.data.map.metadata.get_property("music"),
            Ok(&Attribute::from("cave.ogg"))
        );
    }

    #[test]
    fn test_failed_save_keeps_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document();
        doc.execute(CreateLayer::new(LayerType::Tile, "ground"));

        let path = dir.path().join("missing-dir").join("level.yaml");
        assert!(doc.save_as(&path, SaveFormat::Yaml, &EditorSettings::default()).is_err());
        assert!(doc.is_dirty());
        assert_eq!(doc.data.path, None);
        assert_eq!(
            doc.save(&EditorSettings::default()),
            Err(SaveFormatError::InvalidOperation)
        );
    }

    #[test]
    fn test_load_textures_tracks_tilesets() {
        let dir = tempfile::tempdir().unwrap();
        let image = image_path(dir.path());
        let mut doc = document();
        doc.data.path = Some(dir.path().join("level.yaml"));
        let tileset = Tileset::new(
            "terrain",
            TextureRef {
                path: image.file_name().unwrap().into(),
                width: 32,
                height: 32,
            },
            TileSize::new(16, 16),
        );
        let create = CreateTileset::new(tileset, true);
        doc.execute(create);

        let mut loader = ImageTextureLoader::new();
        doc.load_textures(&mut loader).unwrap();
        assert_eq!(doc.textures.len(), 1);
        doc.undo();
        doc.load_textures(&mut loader).unwrap();
        assert!(doc.textures.is_empty());
    }

    fn image_path(dir: &Path) -> PathBuf {
        let path = dir.join("terrain.png");
        image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 128, 0, 255]))
            .save(&path)
            .unwrap();
        path
    }
}
