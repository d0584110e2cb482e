//! Small value types for grid positions and sizes

use serde::{Deserialize, Serialize};

/// Identifier of a tile within a map, `0` is the empty cell
pub type TileId = i32;

/// The empty-cell sentinel
pub const EMPTY_TILE: TileId = 0;

/// A cell position, rows grow downward and columns to the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub row: i32,
    pub col: i32,
}

impl TilePos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The four edge-adjacent neighbours (north, east, south, west)
    pub fn neighbours(&self) -> [TilePos; 4] {
        [
            TilePos::new(self.row - 1, self.col),
            TilePos::new(self.row, self.col + 1),
            TilePos::new(self.row + 1, self.col),
            TilePos::new(self.row, self.col - 1),
        ]
    }
}

/// Row and column count of a grid, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileExtent {
    pub rows: usize,
    pub cols: usize,
}

impl Default for TileExtent {
    fn default() -> Self {
        Self { rows: 1, cols: 1 }
    }
}

impl TileExtent {
    /// Create an extent, clamping both counts to the 1x1 floor
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows
            && (pos.col as usize) < self.cols
    }

    /// Position of a row-major linear index
    pub fn pos_of(&self, index: usize) -> TilePos {
        TilePos::new((index / self.cols) as i32, (index % self.cols) as i32)
    }

    /// Row-major linear index of an in-bounds position
    pub fn index_of(&self, pos: TilePos) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.row as usize * self.cols + pos.col as usize)
    }
}

/// Pixel size of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
        }
    }
}

impl TileSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A 2D float vector used for object positions and sizes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
