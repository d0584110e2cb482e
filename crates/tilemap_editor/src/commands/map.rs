use super::{Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{Layer, Map, TileExtent, TileFormat, TileId, TileLayer, TilePos};
use uuid::Uuid;

/// Copies of every tile layer, keyed by layer id
type TileSnapshot = Vec<(Uuid, TileLayer)>;

fn snapshot_tiles(map: &Map) -> TileSnapshot {
    let mut snapshot = Vec::new();
    map.root.visit(&mut |layer: &Layer| {
        if let Some(tiles) = layer.as_tile() {
            snapshot.push((layer.id(), tiles.clone()));
        }
    });
    snapshot
}

fn restore_tiles(map: &mut Map, snapshot: &TileSnapshot) {
    for (id, saved) in snapshot {
        match map.find_layer_mut(*id).and_then(Layer::as_tile_mut) {
            Some(tiles) => *tiles = saved.clone(),
            None => tracing::error!("Cannot restore tiles of layer {}: not found", id),
        }
    }
}

/// Set the map to an explicit size
#[derive(Debug, Clone)]
pub struct ResizeMap {
    extent: TileExtent,
    old_extent: Option<TileExtent>,
    cache: TileSnapshot,
}

impl ResizeMap {
    pub fn new(extent: TileExtent) -> Self {
        Self {
            extent,
            old_extent: None,
            cache: Vec::new(),
        }
    }
}

impl Command<MapDocument> for ResizeMap {
    fn redo(&mut self, doc: &mut MapDocument) {
        let old = doc.map.extent();
        self.old_extent = Some(old);
        self.cache = if self.extent.rows < old.rows || self.extent.cols < old.cols {
            snapshot_tiles(&doc.map)
        } else {
            Vec::new()
        };
        doc.map.resize(self.extent);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old_extent else {
            return;
        };
        doc.map.resize(old);
        restore_tiles(&mut doc.map, &self.cache);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ResizeMap
    }
}

/// Direction of an incremental extent change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentChange {
    AddRows,
    AddColumns,
    RemoveRows,
    RemoveColumns,
}

impl ExtentChange {
    fn removes(&self) -> bool {
        matches!(self, ExtentChange::RemoveRows | ExtentChange::RemoveColumns)
    }

    fn apply(&self, extent: TileExtent, count: usize) -> TileExtent {
        match self {
            ExtentChange::AddRows => TileExtent::new(extent.rows + count, extent.cols),
            ExtentChange::AddColumns => TileExtent::new(extent.rows, extent.cols + count),
            ExtentChange::RemoveRows => {
                TileExtent::new(extent.rows.saturating_sub(count), extent.cols)
            }
            ExtentChange::RemoveColumns => {
                TileExtent::new(extent.rows, extent.cols.saturating_sub(count))
            }
        }
    }
}

/// Grow or shrink the map at its bottom or right edge
///
/// Backs `AddRow`, `AddColumn`, `RemoveRow` and `RemoveColumn`. Consecutive
/// changes in the same direction merge into one step. The map never drops
/// below one row or column.
#[derive(Debug, Clone)]
pub struct ChangeExtent {
    change: ExtentChange,
    count: usize,
    old_extent: Option<TileExtent>,
    cache: TileSnapshot,
}

impl ChangeExtent {
    pub fn new(change: ExtentChange, count: usize) -> Self {
        Self {
            change,
            count,
            old_extent: None,
            cache: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.change != other.change {
            return false;
        }
        self.count += other.count;
        true
    }
}

impl Command<MapDocument> for ChangeExtent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let old = doc.map.extent();
        self.old_extent = Some(old);
        if self.change.removes() {
            self.cache = snapshot_tiles(&doc.map);
        }
        doc.map.resize(self.change.apply(old, self.count));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old_extent else {
            return;
        };
        doc.map.resize(old);
        restore_tiles(&mut doc.map, &self.cache);
        self.cache.clear();
    }

    fn kind(&self) -> CommandKind {
        match self.change {
            ExtentChange::AddRows => CommandKind::AddRow,
            ExtentChange::AddColumns => CommandKind::AddColumn,
            ExtentChange::RemoveRows => CommandKind::RemoveRow,
            ExtentChange::RemoveColumns => CommandKind::RemoveColumn,
        }
    }
}

/// Change how tile layers are encoded on save
#[derive(Debug, Clone)]
pub struct SetTileFormat {
    format: TileFormat,
    old: Option<TileFormat>,
}

impl SetTileFormat {
    pub fn new(format: TileFormat) -> Self {
        Self { format, old: None }
    }
}

impl Command<MapDocument> for SetTileFormat {
    fn redo(&mut self, doc: &mut MapDocument) {
        self.old = Some(std::mem::replace(&mut doc.map.tile_format, self.format));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let Some(old) = self.old {
            doc.map.tile_format = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetTileFormat
    }
}

/// Write individual tiles, as a stamp or eraser stroke does
#[derive(Debug, Clone)]
pub struct SetTiles {
    layer: Uuid,
    tiles: Vec<(TilePos, TileId)>,
    /// Previous values of the cells actually written, in write order
    old: Vec<(TilePos, TileId)>,
}

impl SetTiles {
    pub fn new(layer: Uuid, tiles: Vec<(TilePos, TileId)>) -> Self {
        Self {
            layer,
            tiles,
            old: Vec::new(),
        }
    }

    pub fn tiles(&self) -> &[(TilePos, TileId)] {
        &self.tiles
    }
}

impl Command<MapDocument> for SetTiles {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer).and_then(Layer::as_tile_mut) else {
            tracing::error!("Cannot set tiles: no tile layer {}", self.layer);
            return;
        };
        self.old.clear();
        for &(pos, id) in &self.tiles {
            if let Some(previous) = layer.set_tile(pos, id) {
                self.old.push((pos, previous));
            }
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer).and_then(Layer::as_tile_mut) else {
            return;
        };
        for &(pos, id) in self.old.iter().rev() {
            layer.set_tile(pos, id);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetTiles
    }
}

/// Flood-fill regions of a tile layer
///
/// Consecutive fills on the same layer merge into one step.
#[derive(Debug, Clone)]
pub struct BucketFill {
    layer: Uuid,
    fills: Vec<(TilePos, TileId)>,
    /// Every changed cell with its value before the fill, in fill order
    cache: Vec<(TilePos, TileId)>,
}

impl BucketFill {
    pub fn new(layer: Uuid, origin: TilePos, replacement: TileId) -> Self {
        Self {
            layer,
            fills: vec![(origin, replacement)],
            cache: Vec::new(),
        }
    }

    /// Number of cells the last run changed
    pub fn changed(&self) -> usize {
        self.cache.len()
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.layer != other.layer {
            return false;
        }
        self.fills.extend_from_slice(&other.fills);
        self.cache.extend_from_slice(&other.cache);
        true
    }
}

impl Command<MapDocument> for BucketFill {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer).and_then(Layer::as_tile_mut) else {
            tracing::error!("Cannot fill: no tile layer {}", self.layer);
            return;
        };
        self.cache.clear();
        for &(origin, replacement) in &self.fills {
            let Some(target) = layer.get(origin) else {
                continue;
            };
            let changed = layer.flood(origin, replacement);
            self.cache.extend(changed.into_iter().map(|pos| (pos, target)));
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer).and_then(Layer::as_tile_mut) else {
            return;
        };
        for &(pos, id) in self.cache.iter().rev() {
            layer.set_tile(pos, id);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::BucketFill
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{check_inverse, document, layer_id};
    use crate::commands::{CommandStack, MapCommand};
    use tilemap_core::{CompressionMode, TileEncoding};

    fn tiles(doc: &MapDocument, name: &str) -> TileLayer {
        let id = layer_id(doc, name);
        doc.map.find_layer(id).unwrap().as_tile().unwrap().clone()
    }

    fn paint(doc: &mut MapDocument, cells: &[(i32, i32, TileId)]) {
        let id = layer_id(doc, "ground");
        let layer = doc.map.find_layer_mut(id).unwrap().as_tile_mut().unwrap();
        for &(row, col, tile) in cells {
            layer.set_tile(TilePos::new(row, col), tile);
        }
    }

    #[test]
    fn test_bucket_fill_diagonal() {
        let mut doc = document();
        let diagonal: Vec<_> = (0..5).map(|i| (i, i, 1)).collect();
        paint(&mut doc, &diagonal);
        let ground = layer_id(&doc, "ground");

        let mut stack = CommandStack::new(10);
        stack.push(
            &mut doc,
            MapCommand::from(BucketFill::new(ground, TilePos::new(1, 0), 2)),
        );

        let filled = tiles(&doc, "ground");
        for row in 0..5 {
            for col in 0..5 {
                let expected = match row.cmp(&col) {
                    std::cmp::Ordering::Greater => 2,
                    std::cmp::Ordering::Equal => 1,
                    std::cmp::Ordering::Less => 0,
                };
                assert_eq!(filled.get(TilePos::new(row, col)), Some(expected));
            }
        }
        assert_eq!(filled.tiles().iter().filter(|&&id| id == 2).count(), 10);

        stack.undo(&mut doc);
        let restored = tiles(&doc, "ground");
        assert_eq!(restored.tiles().iter().filter(|&&id| id == 0).count(), 20);
        assert_eq!(restored.tiles().iter().filter(|&&id| id == 1).count(), 5);
    }

    #[test]
    fn test_bucket_fills_merge_per_layer() {
        let mut doc = document();
        paint(&mut doc, &[(0, 2, 1), (1, 2, 1), (2, 2, 1), (3, 2, 1), (4, 2, 1)]);
        let ground = layer_id(&doc, "ground");
        let before = tiles(&doc, "ground");

        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(BucketFill::new(ground, TilePos::new(0, 0), 3)));
        stack.push(&mut doc, MapCommand::from(BucketFill::new(ground, TilePos::new(0, 4), 4)));
        // refill of an already filled region
        stack.push(&mut doc, MapCommand::from(BucketFill::new(ground, TilePos::new(0, 0), 5)));
        assert_eq!(stack.len(), 1);
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(4, 0)), Some(5));
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(4, 4)), Some(4));

        stack.undo(&mut doc);
        assert_eq!(tiles(&doc, "ground"), before);
        stack.redo(&mut doc);
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(4, 0)), Some(5));
    }

    #[test]
    fn test_bucket_fill_without_change() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        check_inverse(&mut doc, BucketFill::new(ground, TilePos::new(0, 0), 0));
        check_inverse(&mut doc, BucketFill::new(ground, TilePos::new(9, 9), 3));
    }

    #[test]
    fn test_set_tiles() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        let stroke = vec![
            (TilePos::new(0, 0), 4),
            (TilePos::new(0, 0), 5),
            (TilePos::new(7, 7), 5),
            (TilePos::new(2, 3), 6),
        ];
        check_inverse(&mut doc, SetTiles::new(ground, stroke));
        let layer = tiles(&doc, "ground");
        assert_eq!(layer.get(TilePos::new(0, 0)), Some(5));
        assert_eq!(layer.get(TilePos::new(2, 3)), Some(6));
    }

    #[test]
    fn test_remove_rows_restores_data() {
        let mut doc = document();
        paint(&mut doc, &[(3, 1, 7), (4, 4, 8)]);
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::remove_rows(1));
        stack.push(&mut doc, MapCommand::remove_rows(2));
        assert_eq!(stack.len(), 1);
        assert_eq!(doc.map.extent(), TileExtent::new(2, 5));
        assert_eq!(tiles(&doc, "ground").rows(), 2);

        stack.undo(&mut doc);
        assert_eq!(doc.map.extent(), TileExtent::new(5, 5));
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(3, 1)), Some(7));
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(4, 4)), Some(8));
    }

    #[test]
    fn test_extent_never_below_one() {
        let mut doc = document();
        paint(&mut doc, &[(0, 0, 2)]);
        check_inverse(&mut doc, MapCommand::remove_columns(10));
        assert_eq!(doc.map.extent(), TileExtent::new(5, 1));
        assert_eq!(tiles(&doc, "ground").get(TilePos::new(0, 0)), Some(2));
    }

    #[test]
    fn test_add_rows_and_columns_do_not_merge_together() {
        let mut doc = document();
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::add_rows(1));
        stack.push(&mut doc, MapCommand::add_rows(1));
        stack.push(&mut doc, MapCommand::add_columns(2));
        assert_eq!(stack.len(), 2);
        assert_eq!(doc.map.extent(), TileExtent::new(7, 7));
        assert_eq!(stack.undo_kind(), Some(CommandKind::AddColumn));

        stack.undo(&mut doc);
        stack.undo(&mut doc);
        assert_eq!(doc.map.extent(), TileExtent::new(5, 5));
    }

    #[test]
    fn test_resize_map() {
        let mut doc = document();
        paint(&mut doc, &[(4, 4, 9)]);
        check_inverse(&mut doc, ResizeMap::new(TileExtent::new(2, 8)));
        assert_eq!(tiles(&doc, "ground").cols(), 8);
    }

    #[test]
    fn test_set_tile_format() {
        let mut doc = document();
        let format = TileFormat {
            encoding: TileEncoding::Base64,
            compression: CompressionMode::Zstd,
            zlib_level: None,
            zstd_level: Some(3),
        };
        check_inverse(&mut doc, SetTileFormat::new(format));
        assert_eq!(doc.map.tile_format, format);
    }
}
