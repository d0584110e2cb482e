//! Painting tools that turn pointer input into tile commands
//!
//! Tools only read the map. They return a command for the caller to
//! execute, or `None` when there is nothing to paint with or on.

use crate::commands::{BucketFill, SetTiles};
use crate::context::EditorContext;
use tilemap_core::{
    AttachedTileset, Layer, Map, TileId, TileLayer, TilePos, TileRegion, EMPTY_TILE,
};
use uuid::Uuid;

/// How the stamp picks tiles from the tileset selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampMode {
    /// Place the selection as a block, anchored at its top-left tile
    #[default]
    Pattern,
    /// Place one randomly chosen selected tile per cell
    Random,
}

/// Paints with the active tileset's selection
#[derive(Debug, Clone, Copy, Default)]
pub struct StampTool {
    pub mode: StampMode,
}

impl StampTool {
    pub fn new(mode: StampMode) -> Self {
        Self { mode }
    }

    /// Stamp at every position of a stroke
    ///
    /// Cells outside the layer are skipped. Later positions overwrite
    /// earlier ones where pattern stamps overlap.
    pub fn stamp(
        &self,
        map: &Map,
        layer: Uuid,
        positions: &[TilePos],
        ctx: &mut EditorContext,
    ) -> Option<SetTiles> {
        let tiles = tile_layer(map, layer)?;
        let (attached, selection) = active_selection(map)?;
        let mut writes = Vec::new();
        for &origin in positions {
            match self.mode {
                StampMode::Pattern => {
                    for pos in selection.positions() {
                        let target = TilePos::new(
                            origin.row + pos.row - selection.top_left.row,
                            origin.col + pos.col - selection.top_left.col,
                        );
                        if let Some(id) = tile_at(attached, pos) {
                            writes.push((target, id));
                        }
                    }
                }
                StampMode::Random => {
                    if let Some(id) = random_tile(attached, ctx) {
                        writes.push((origin, id));
                    }
                }
            }
        }
        writes.retain(|(pos, _)| tiles.contains(*pos));
        (!writes.is_empty()).then(|| SetTiles::new(layer, writes))
    }

    /// Fill the rectangle between two corners, clipped to the layer
    ///
    /// Pattern mode repeats the selection across the rectangle.
    pub fn rectangle(
        &self,
        map: &Map,
        layer: Uuid,
        a: TilePos,
        b: TilePos,
        ctx: &mut EditorContext,
    ) -> Option<SetTiles> {
        let tiles = tile_layer(map, layer)?;
        let (attached, selection) = active_selection(map)?;
        let area = TileRegion::new(a, b);
        let mut writes = Vec::new();
        for pos in area.positions().filter(|pos| tiles.contains(*pos)) {
            let id = match self.mode {
                StampMode::Pattern => {
                    let row = (pos.row - area.top_left.row).rem_euclid(selection.rows());
                    let col = (pos.col - area.top_left.col).rem_euclid(selection.cols());
                    let source = TilePos::new(
                        selection.top_left.row + row,
                        selection.top_left.col + col,
                    );
                    tile_at(attached, source)
                }
                StampMode::Random => random_tile(attached, ctx),
            };
            if let Some(id) = id {
                writes.push((pos, id));
            }
        }
        (!writes.is_empty()).then(|| SetTiles::new(layer, writes))
    }

    /// Flood fill from `origin` with the first selected tile, or a random
    /// one in random mode
    pub fn bucket_fill(
        &self,
        map: &Map,
        layer: Uuid,
        origin: TilePos,
        ctx: &mut EditorContext,
    ) -> Option<BucketFill> {
        let tiles = tile_layer(map, layer)?;
        if !tiles.contains(origin) {
            return None;
        }
        let (attached, selection) = active_selection(map)?;
        let id = match self.mode {
            StampMode::Pattern => tile_at(attached, selection.top_left),
            StampMode::Random => random_tile(attached, ctx),
        }?;
        Some(BucketFill::new(layer, origin, id))
    }
}

/// Clear every in-bounds cell of a stroke
pub fn erase(map: &Map, layer: Uuid, positions: &[TilePos]) -> Option<SetTiles> {
    let tiles = tile_layer(map, layer)?;
    let writes: Vec<(TilePos, TileId)> = positions
        .iter()
        .filter(|pos| tiles.get(**pos).is_some_and(|id| id != EMPTY_TILE))
        .map(|&pos| (pos, EMPTY_TILE))
        .collect();
    (!writes.is_empty()).then(|| SetTiles::new(layer, writes))
}

/// Every tile position on the straight line between two cells
///
/// Walks the longer axis one cell at a time and rounds the other, so the
/// line has one cell per step and no gaps.
pub fn line(from: TilePos, to: TilePos) -> Vec<TilePos> {
    let rows = i64::from(to.row) - i64::from(from.row);
    let cols = i64::from(to.col) - i64::from(from.col);
    let steps = rows.abs().max(cols.abs());
    if steps == 0 {
        return vec![from];
    }
    // rounds half away from the start
    let offset = |delta: i64, step: i64| {
        delta.signum() * ((2 * delta.abs() * step + steps) / (2 * steps))
    };
    (0..=steps)
        .map(|step| {
            TilePos::new(
                (i64::from(from.row) + offset(rows, step)) as i32,
                (i64::from(from.col) + offset(cols, step)) as i32,
            )
        })
        .collect()
}

/// Connect the pointer samples of a drag into one gapless stroke
///
/// Shared ends of consecutive segments appear once.
pub fn stroke(samples: &[TilePos]) -> Vec<TilePos> {
    let mut points: Vec<TilePos> = samples.first().copied().into_iter().collect();
    for pair in samples.windows(2) {
        points.extend(line(pair[0], pair[1]).into_iter().skip(1));
    }
    points
}

fn tile_layer(map: &Map, layer: Uuid) -> Option<&TileLayer> {
    let tiles = map.find_layer(layer).and_then(Layer::as_tile);
    if tiles.is_none() {
        tracing::debug!("Layer {} is not a tile layer", layer);
    }
    tiles
}

fn active_selection(map: &Map) -> Option<(&AttachedTileset, TileRegion)> {
    let attached = map.tileset(map.active_tileset?)?;
    Some((attached, attached.selection?))
}

fn tile_at(attached: &AttachedTileset, pos: TilePos) -> Option<TileId> {
    let cols = attached.tileset.column_count as i32;
    if pos.col < 0 || pos.col >= cols {
        return None;
    }
    attached.to_tile_id(pos.row * cols + pos.col)
}

fn random_tile(attached: &AttachedTileset, ctx: &mut EditorContext) -> Option<TileId> {
    let ids = attached.selected_tile_ids();
    if ids.is_empty() {
        return None;
    }
    Some(ids[ctx.rng.usize(..ids.len())])
}
