use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one tile of the pyramid.
///
/// `x`/`y` are signed because tile math floors raw pixel coordinates, which
/// may lie left of or above the origin near the antimeridian or the poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileKey {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Center of this tile in the pixel space of zoom `z`.
    pub fn pixel_center(&self, tile_size: u32) -> Point {
        let size = tile_size as f64;
        Point::new(
            (self.x as f64 + 0.5) * size,
            (self.y as f64 + 0.5) * size,
        )
    }

    /// Top-left pixel corner of this tile.
    pub fn pixel_origin(&self, tile_size: u32) -> Point {
        let size = tile_size as f64;
        Point::new(self.x as f64 * size, self.y as f64 * size)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Load state of a tile within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileState {
    Pending,
    Loaded,
    Failed,
}

impl TileState {
    /// `true` once a load has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TileState::Pending)
    }
}

/// Inclusive rectangle of tile coordinates at a single zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub z: u8,
}

impl TileRange {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64, z: u8) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
            z,
        }
    }

    /// Number of tiles covered by the range, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        let columns = self.max_x as i128 - self.min_x as i128 + 1;
        let rows = self.max_y as i128 - self.min_y as i128 + 1;
        usize::try_from(columns.saturating_mul(rows)).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        key.z == self.z
            && (self.min_x..=self.max_x).contains(&key.x)
            && (self.min_y..=self.max_y).contains(&key.y)
    }

    /// Keys in row-major order (y outer, x inner).
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| TileKey::new(x, y, self.z)))
    }
}
