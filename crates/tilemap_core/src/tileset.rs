//! Tilesets, per-tile definitions and the map-local tileset binding

use crate::geometry::{TileId, TilePos, TileSize};
use crate::metadata::Metadata;
use crate::object::Object;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Index of a tile inside its tileset, starting at 0
pub type TileIndex = i32;

/// The image a tileset slices into tiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// One frame of a tile animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile: TileIndex,
    pub duration_ms: u32,
}

/// A looping sequence of frames
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileAnimation {
    pub frames: Vec<AnimationFrame>,
}

impl TileAnimation {
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }

    /// The frame showing after `elapsed_ms`, wrapping around the loop
    pub fn frame_at(&self, elapsed_ms: u64) -> Option<&AnimationFrame> {
        let total = self.total_duration_ms();
        if total == 0 {
            return self.frames.first();
        }
        let mut remaining = elapsed_ms % total;
        for frame in &self.frames {
            let duration = u64::from(frame.duration_ms);
            if remaining < duration {
                return Some(frame);
            }
            remaining -= duration;
        }
        self.frames.last()
    }
}

/// Extra data for one tile of a tileset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub metadata: Metadata,
    pub animation: Option<TileAnimation>,
    /// Collision shapes and other objects local to the tile
    pub objects: IndexMap<Uuid, Object>,
}

impl Default for TileDefinition {
    fn default() -> Self {
        Self {
            metadata: Metadata::new(""),
            animation: None,
            objects: IndexMap::new(),
        }
    }
}

impl TileDefinition {
    /// Whether the definition carries nothing worth saving
    pub fn is_empty(&self) -> bool {
        self.animation.is_none()
            && self.objects.is_empty()
            && self.metadata.properties.is_empty()
            && self.metadata.components.is_empty()
    }
}

/// A grid of tiles cut from one texture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    /// `metadata.id` is the tileset uuid
    pub metadata: Metadata,
    pub texture: TextureRef,
    pub tile_size: TileSize,
    pub row_count: u32,
    pub column_count: u32,
    /// Sparse per-tile data
    pub tiles: BTreeMap<TileIndex, TileDefinition>,
}

impl Tileset {
    /// Create a tileset covering as many whole tiles as fit in the texture
    pub fn new(name: impl Into<String>, texture: TextureRef, tile_size: TileSize) -> Self {
        let column_count = texture.width.checked_div(tile_size.width).unwrap_or(0).max(1);
        let row_count = texture.height.checked_div(tile_size.height).unwrap_or(0).max(1);
        Self {
            metadata: Metadata::new(name),
            texture,
            tile_size,
            row_count,
            column_count,
            tiles: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn tile_count(&self) -> u32 {
        self.row_count.saturating_mul(self.column_count)
    }

    /// Number of global tile ids the tileset occupies when attached, at
    /// least one, or `None` if the grid is too large for the id space
    pub fn id_span(&self) -> Option<TileId> {
        let cells = self.row_count.checked_mul(self.column_count)?;
        TileId::try_from(cells).ok().map(|count| count.max(1))
    }

    pub fn contains_index(&self, index: TileIndex) -> bool {
        index >= 0 && (index as u32) < self.tile_count()
    }

    /// Grid position of a tile index within the texture
    pub fn position_of(&self, index: TileIndex) -> Option<TilePos> {
        if !self.contains_index(index) {
            return None;
        }
        let cols = self.column_count as i32;
        Some(TilePos::new(index / cols, index % cols))
    }

    /// Pixel rectangle `(x, y, width, height)` of a tile in the texture
    pub fn tile_rect(&self, index: TileIndex) -> Option<(u32, u32, u32, u32)> {
        let pos = self.position_of(index)?;
        Some((
            pos.col as u32 * self.tile_size.width,
            pos.row as u32 * self.tile_size.height,
            self.tile_size.width,
            self.tile_size.height,
        ))
    }

    pub fn tile_definition(&self, index: TileIndex) -> Option<&TileDefinition> {
        self.tiles.get(&index)
    }

    /// Get or create the definition of an in-range tile
    pub fn tile_definition_mut(&mut self, index: TileIndex) -> Option<&mut TileDefinition> {
        if !self.contains_index(index) {
            return None;
        }
        Some(self.tiles.entry(index).or_default())
    }
}

/// A rectangular selection of tiles in a tileset grid (inclusive corners)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRegion {
    pub top_left: TilePos,
    pub bottom_right: TilePos,
}

impl TileRegion {
    /// Region spanning two corners given in any order
    pub fn new(a: TilePos, b: TilePos) -> Self {
        Self {
            top_left: TilePos::new(a.row.min(b.row), a.col.min(b.col)),
            bottom_right: TilePos::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(pos: TilePos) -> Self {
        Self::new(pos, pos)
    }

    pub fn rows(&self) -> i32 {
        self.bottom_right.row - self.top_left.row + 1
    }

    pub fn cols(&self) -> i32 {
        self.bottom_right.col - self.top_left.col + 1
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.row >= self.top_left.row
            && pos.row <= self.bottom_right.row
            && pos.col >= self.top_left.col
            && pos.col <= self.bottom_right.col
    }

    /// Positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        (self.top_left.row..=self.bottom_right.row).flat_map(move |row| {
            (self.top_left.col..=self.bottom_right.col).map(move |col| TilePos::new(row, col))
        })
    }
}

/// A tileset bound to a map with its range of global tile ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedTileset {
    pub tileset: Tileset,
    pub first_tile_id: TileId,
    pub last_tile_id: TileId,
    /// Stored inline in the map file rather than as a separate tileset file
    pub embedded: bool,
    pub selection: Option<TileRegion>,
}

impl AttachedTileset {
    pub fn id(&self) -> Uuid {
        self.tileset.id()
    }

    pub fn contains(&self, id: TileId) -> bool {
        id >= self.first_tile_id && id <= self.last_tile_id
    }

    /// Tileset-local index of a global tile id
    pub fn to_index(&self, id: TileId) -> Option<TileIndex> {
        self.contains(id).then(|| id - self.first_tile_id)
    }

    /// Global tile id of a tileset-local index
    pub fn to_tile_id(&self, index: TileIndex) -> Option<TileId> {
        self.tileset
            .contains_index(index)
            .then(|| self.first_tile_id + index)
    }

    /// Global tile ids of the selected tiles, row by row
    pub fn selected_tile_ids(&self) -> Vec<TileId> {
        let Some(selection) = self.selection else {
            return Vec::new();
        };
        let cols = self.tileset.column_count as i32;
        selection
            .positions()
            .filter(|pos| pos.col >= 0 && pos.col < cols)
            .filter_map(|pos| self.to_tile_id(pos.row * cols + pos.col))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain() -> Tileset {
        Tileset::new(
            "terrain",
            TextureRef {
                path: PathBuf::from("terrain.png"),
                width: 128,
                height: 64,
            },
            TileSize::new(32, 32),
        )
    }

    #[test]
    fn test_grid_from_texture() {
        let tileset = terrain();
        assert_eq!(tileset.column_count, 4);
        assert_eq!(tileset.row_count, 2);
        assert_eq!(tileset.tile_count(), 8);
        assert_eq!(tileset.position_of(5), Some(TilePos::new(1, 1)));
        assert_eq!(tileset.tile_rect(5), Some((32, 32, 32, 32)));
        assert_eq!(tileset.position_of(8), None);
    }

    #[test]
    fn test_tile_definition_mut_creates_in_range() {
        let mut tileset = terrain();
        assert!(tileset.tile_definition_mut(3).is_some());
        assert!(tileset.tile_definition_mut(99).is_none());
        assert_eq!(tileset.tiles.len(), 1);
        assert!(tileset.tile_definition(3).unwrap().is_empty());
    }

    #[test]
    fn test_animation_frame_at_wraps() {
        let animation = TileAnimation {
            frames: vec![
                AnimationFrame {
                    tile: 0,
                    duration_ms: 100,
                },
                AnimationFrame {
                    tile: 1,
                    duration_ms: 50,
                },
            ],
        };
        assert_eq!(animation.frame_at(0).unwrap().tile, 0);
        assert_eq!(animation.frame_at(99).unwrap().tile, 0);
        assert_eq!(animation.frame_at(100).unwrap().tile, 1);
        assert_eq!(animation.frame_at(160).unwrap().tile, 0);
        assert!(TileAnimation::default().frame_at(10).is_none());
    }

    #[test]
    fn test_attached_id_mapping() {
        let attached = AttachedTileset {
            tileset: terrain(),
            first_tile_id: 10,
            last_tile_id: 17,
            embedded: true,
            selection: Some(TileRegion::new(TilePos::new(1, 1), TilePos::new(0, 0))),
        };
        assert_eq!(attached.to_index(10), Some(0));
        assert_eq!(attached.to_index(18), None);
        assert_eq!(attached.to_tile_id(7), Some(17));
        assert_eq!(attached.to_tile_id(8), None);
        assert_eq!(attached.selected_tile_ids(), vec![10, 11, 14, 15]);
    }
}
