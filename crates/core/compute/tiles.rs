//! Tile coordinate math.
//!
//! Pure functions from pixel-space geometry to the tile rectangles that cover
//! it. No state, no projection: callers project first.

use crate::compute::validation::validate_extent;
use crate::error::{Result, TileProbeError};
use geo::Point;
use std::cmp::Ordering;
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::tile::{TileKey, TileRange};

/// Tiles covering the square `[p.x-r, p.x+r] x [p.y-r, p.y+r]`.
///
/// Both corners are divided by `tile_size` and floored, so a square that
/// touches a tile edge includes the tile on the far side of it.
///
/// # Examples
///
/// ```
/// use geo::Point;
/// use tileprobe::compute::tiles::tile_range;
///
/// let range = tile_range(&Point::new(300.0, 10.0), 20.0, 256, 3).unwrap();
/// assert_eq!((range.min_x, range.max_x), (1, 1));
/// assert_eq!((range.min_y, range.max_y), (-1, 0));
/// ```
pub fn tile_range(center: &Point, extent: f64, tile_size: u32, zoom: u8) -> Result<TileRange> {
    validate_extent(extent)?;
    if tile_size == 0 {
        return Err(TileProbeError::InvalidQueryParameter(
            "Tile size must be greater than zero".to_string(),
        ));
    }
    if !center.x().is_finite() || !center.y().is_finite() {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Pixel coordinates must be finite, got: ({}, {})",
            center.x(),
            center.y()
        )));
    }

    Ok(bbox_range(&BoundingBox2D::around(center, extent), tile_size, zoom))
}

/// Tiles covering a pixel-space box.
pub fn bbox_range(bbox: &BoundingBox2D, tile_size: u32, zoom: u8) -> TileRange {
    let size = tile_size as f64;
    TileRange::new(
        (bbox.min_x() / size).floor() as i64,
        (bbox.min_y() / size).floor() as i64,
        (bbox.max_x() / size).floor() as i64,
        (bbox.max_y() / size).floor() as i64,
        zoom,
    )
}

/// Sort keys by ascending distance from `center` to each tile's pixel center.
///
/// The sort is stable, so equidistant tiles keep their row-major order.
pub fn prioritize(keys: &mut [TileKey], center: &Point, tile_size: u32) {
    let distance_sq = |key: &TileKey| {
        let c = key.pixel_center(tile_size);
        let dx = c.x() - center.x();
        let dy = c.y() - center.y();
        dx * dx + dy * dy
    };
    keys.sort_by(|a, b| {
        distance_sq(a)
            .partial_cmp(&distance_sq(b))
            .unwrap_or(Ordering::Equal)
    });
}
