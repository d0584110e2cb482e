//! The map: layer tree, attached tilesets and map-wide settings

use crate::geometry::{TileExtent, TileId, TileSize};
use crate::layer::{GroupLayer, Layer, LayerKind, LayerType};
use crate::metadata::Metadata;
use crate::tileset::{AttachedTileset, Tileset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Textual representation of tile layer data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileEncoding {
    /// Integers written out as text (CSV, JSON array or space separated)
    #[default]
    PlainText,
    /// Little-endian `i32` ids, base64 encoded
    Base64,
}

/// Compression applied to base64 tile data before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionMode {
    #[default]
    None,
    Zlib,
    Zstd,
}

/// How tile layers are written when the map is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileFormat {
    pub encoding: TileEncoding,
    pub compression: CompressionMode,
    pub zlib_level: Option<i32>,
    pub zstd_level: Option<i32>,
}

impl TileFormat {
    /// Compression that actually applies, which is none for plain text
    pub fn effective_compression(&self) -> CompressionMode {
        match self.encoding {
            TileEncoding::PlainText => CompressionMode::None,
            TileEncoding::Base64 => self.compression,
        }
    }

    /// Level for the active compression mode, if one was set
    pub fn level(&self) -> Option<i32> {
        match self.effective_compression() {
            CompressionMode::None => None,
            CompressionMode::Zlib => self.zlib_level,
            CompressionMode::Zstd => self.zstd_level,
        }
    }
}

/// A tile map document model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub metadata: Metadata,
    extent: TileExtent,
    pub tile_size: TileSize,
    pub root: GroupLayer,
    tilesets: Vec<AttachedTileset>,
    pub active_layer: Option<Uuid>,
    pub active_tileset: Option<Uuid>,
    pub tile_format: TileFormat,
    pub next_layer_id: i32,
    pub next_object_id: i32,
    next_tile_id: TileId,
}

impl Default for Map {
    fn default() -> Self {
        Self::new("untitled", TileExtent::new(16, 16), TileSize::default())
    }
}

impl Map {
    pub fn new(name: impl Into<String>, extent: TileExtent, tile_size: TileSize) -> Self {
        Self {
            metadata: Metadata::new(name),
            extent: TileExtent::new(extent.rows, extent.cols),
            tile_size,
            root: GroupLayer::new(),
            tilesets: Vec::new(),
            active_layer: None,
            active_tileset: None,
            tile_format: TileFormat::default(),
            next_layer_id: 1,
            next_object_id: 1,
            next_tile_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn extent(&self) -> TileExtent {
        self.extent
    }

    /// Resize the map and every tile layer in it (floor of 1x1)
    pub fn resize(&mut self, extent: TileExtent) {
        let extent = TileExtent::new(extent.rows, extent.cols);
        self.extent = extent;
        self.root.visit_mut(&mut |layer: &mut Layer| {
            if let Some(tiles) = layer.as_tile_mut() {
                tiles.resize(extent);
            }
        });
    }

    /// Create a layer sized to the map with a fresh persistent id
    pub fn new_layer(&mut self, ty: LayerType, name: impl Into<String>) -> Layer {
        let mut layer = Layer::of_type(ty, name, self.extent);
        self.assign_persistent_ids(&mut layer);
        layer
    }

    /// Give every layer and object in `layer` without a persistent id a new one
    pub fn assign_persistent_ids(&mut self, layer: &mut Layer) {
        if layer.persistent_id.is_none() {
            layer.persistent_id = Some(self.next_layer_id);
            self.next_layer_id += 1;
        }
        match &mut layer.kind {
            LayerKind::Tile(_) => {}
            LayerKind::Object(objects) => {
                for object in objects.iter_mut() {
                    if object.persistent_id.is_none() {
                        object.persistent_id = Some(self.next_object_id);
                        self.next_object_id += 1;
                    }
                }
            }
            LayerKind::Group(group) => {
                for child in &mut group.children {
                    self.assign_persistent_ids(child);
                }
            }
        }
    }

    /// Hand out the next object persistent id
    pub fn take_object_id(&mut self) -> i32 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    pub fn find_layer(&self, id: Uuid) -> Option<&Layer> {
        self.root.find(id)
    }

    pub fn find_layer_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        self.root.find_mut(id)
    }

    /// Group that receives new layers: the active layer if it is a group,
    /// otherwise the active layer's parent, otherwise the root
    pub fn insertion_group(&self) -> Option<Uuid> {
        let active = self.active_layer?;
        match self.find_layer(active) {
            Some(layer) if layer.layer_type() == LayerType::Group => Some(active),
            Some(_) => self.root.locate(active).and_then(|(parent, _)| parent),
            None => None,
        }
    }

    /// All layers in depth-first order
    pub fn layers(&self) -> Vec<&Layer> {
        let mut layers = Vec::new();
        self.root.visit(&mut |layer| layers.push(layer));
        layers
    }

    pub fn tilesets(&self) -> &[AttachedTileset] {
        &self.tilesets
    }

    /// First id the next attached tileset will receive
    pub fn next_tile_id(&self) -> TileId {
        self.next_tile_id
    }

    /// Attach a tileset after every existing range, returning its id range
    ///
    /// Fails, handing the tileset back, when the remaining tile ids cannot
    /// hold it.
    pub fn attach_tileset(
        &mut self,
        tileset: Tileset,
        embedded: bool,
    ) -> Result<(TileId, TileId), Tileset> {
        let first = self.next_tile_id;
        let range = tileset.id_span().and_then(|count| {
            let last = first.checked_add(count - 1)?;
            Some((last, last.checked_add(1)?))
        });
        let Some((last, next)) = range else {
            tracing::warn!(
                "Tileset '{}' does not fit in the tile ids left after {}",
                tileset.name(),
                first
            );
            return Err(tileset);
        };
        self.tilesets.push(AttachedTileset {
            tileset,
            first_tile_id: first,
            last_tile_id: last,
            embedded,
            selection: None,
        });
        self.next_tile_id = next;
        tracing::debug!("Attached tileset with tile ids {}..={}", first, last);
        Ok((first, last))
    }

    /// Insert a tileset with an already assigned range at `index`
    ///
    /// Fails, handing the tileset back, if the range overlaps an attached one.
    pub fn insert_tileset(
        &mut self,
        index: usize,
        attached: AttachedTileset,
    ) -> Result<(), AttachedTileset> {
        if attached.first_tile_id < 1 || attached.last_tile_id < attached.first_tile_id {
            return Err(attached);
        }
        let Some(next) = attached.last_tile_id.checked_add(1) else {
            tracing::warn!(
                "Tileset '{}' ends at the last tile id",
                attached.tileset.name()
            );
            return Err(attached);
        };
        let overlaps = self.tilesets.iter().any(|other| {
            attached.first_tile_id <= other.last_tile_id
                && other.first_tile_id <= attached.last_tile_id
        });
        if overlaps {
            tracing::warn!(
                "Tileset '{}' range {}..={} overlaps an attached tileset",
                attached.tileset.name(),
                attached.first_tile_id,
                attached.last_tile_id
            );
            return Err(attached);
        }
        self.next_tile_id = self.next_tile_id.max(next);
        let index = index.min(self.tilesets.len());
        self.tilesets.insert(index, attached);
        Ok(())
    }

    /// Detach a tileset, returning its former position and binding
    pub fn detach_tileset(&mut self, id: Uuid) -> Option<(usize, AttachedTileset)> {
        let index = self.tilesets.iter().position(|t| t.id() == id)?;
        if self.active_tileset == Some(id) {
            self.active_tileset = None;
        }
        Some((index, self.tilesets.remove(index)))
    }

    pub fn tileset(&self, id: Uuid) -> Option<&AttachedTileset> {
        self.tilesets.iter().find(|t| t.id() == id)
    }

    pub fn tileset_mut(&mut self, id: Uuid) -> Option<&mut AttachedTileset> {
        self.tilesets.iter_mut().find(|t| t.id() == id)
    }

    /// The tileset whose range contains a global tile id
    pub fn tileset_for_tile(&self, tile: TileId) -> Option<&AttachedTileset> {
        self.tilesets.iter().find(|t| t.contains(tile))
    }

    /// Find any metadata block in the map by its id
    pub fn find_metadata(&self, id: Uuid) -> Option<&Metadata> {
        if self.metadata.id == id {
            return Some(&self.metadata);
        }
        if let Some(found) = layer_metadata(&self.root, id) {
            return Some(found);
        }
        for attached in &self.tilesets {
            let tileset = &attached.tileset;
            if tileset.metadata.id == id {
                return Some(&tileset.metadata);
            }
            for definition in tileset.tiles.values() {
                if definition.metadata.id == id {
                    return Some(&definition.metadata);
                }
                if let Some(object) = definition.objects.get(&id) {
                    return Some(&object.metadata);
                }
            }
        }
        None
    }

    pub fn find_metadata_mut(&mut self, id: Uuid) -> Option<&mut Metadata> {
        if self.metadata.id == id {
            return Some(&mut self.metadata);
        }
        if let Some(found) = layer_metadata_mut(&mut self.root, id) {
            return Some(found);
        }
        for attached in &mut self.tilesets {
            let tileset = &mut attached.tileset;
            if tileset.metadata.id == id {
                return Some(&mut tileset.metadata);
            }
            for definition in tileset.tiles.values_mut() {
                if definition.metadata.id == id {
                    return Some(&mut definition.metadata);
                }
                if let Some(object) = definition.objects.get_mut(&id) {
                    return Some(&mut object.metadata);
                }
            }
        }
        None
    }

    /// Call `f` on every metadata block in the map
    pub fn visit_metadata_mut<F: FnMut(&mut Metadata)>(&mut self, f: &mut F) {
        f(&mut self.metadata);
        self.root.visit_mut(&mut |layer: &mut Layer| {
            f(&mut layer.metadata);
            if let Some(objects) = layer.as_objects_mut() {
                for object in objects.iter_mut() {
                    f(&mut object.metadata);
                }
            }
        });
        for attached in &mut self.tilesets {
            f(&mut attached.tileset.metadata);
            for definition in attached.tileset.tiles.values_mut() {
                f(&mut definition.metadata);
                for object in definition.objects.values_mut() {
                    f(&mut object.metadata);
                }
            }
        }
    }
}

fn layer_metadata(group: &GroupLayer, id: Uuid) -> Option<&Metadata> {
    for layer in &group.children {
        if layer.metadata.id == id {
            return Some(&layer.metadata);
        }
        match &layer.kind {
            LayerKind::Object(objects) => {
                if let Some(object) = objects.get(id) {
                    return Some(&object.metadata);
                }
            }
            LayerKind::Group(child) => {
                if let Some(found) = layer_metadata(child, id) {
                    return Some(found);
                }
            }
            LayerKind::Tile(_) => {}
        }
    }
    None
}

fn layer_metadata_mut(group: &mut GroupLayer, id: Uuid) -> Option<&mut Metadata> {
    for layer in &mut group.children {
        if layer.metadata.id == id {
            return Some(&mut layer.metadata);
        }
        match &mut layer.kind {
            LayerKind::Object(objects) => {
                if let Some(object) = objects.get_mut(id) {
                    return Some(&mut object.metadata);
                }
            }
            LayerKind::Group(child) => {
                if let Some(found) = layer_metadata_mut(child, id) {
                    return Some(found);
                }
            }
            LayerKind::Tile(_) => {}
        }
    }
    None
}
