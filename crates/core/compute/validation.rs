//! Validation for query parameters and geographic coordinates.
//!
//! Everything here runs before any tile work starts, so a rejected query never
//! touches the network or the index.

use crate::error::{Result, TileProbeError};
use geo::Point;
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::tile::TileRange;

/// Validates a point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use tileprobe::compute::validation::validate_geographic_point;
/// use geo::Point;
///
/// assert!(validate_geographic_point(&Point::new(11.95, 57.7)).is_ok());
/// assert!(validate_geographic_point(&Point::new(200.0, 40.0)).is_err());
/// assert!(validate_geographic_point(&Point::new(-74.0, 95.0)).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() || !y.is_finite() {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Coordinates must be finite, got: ({}, {})",
            x, y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates a search extent (radius or half-tolerance).
///
/// Zero is allowed; it only ever matches through containment.
///
/// ```
/// use tileprobe::compute::validation::validate_extent;
///
/// assert!(validate_extent(20.0).is_ok());
/// assert!(validate_extent(0.0).is_ok());
/// assert!(validate_extent(-1.0).is_err());
/// assert!(validate_extent(f64::INFINITY).is_err());
/// ```
pub fn validate_extent(extent: f64) -> Result<()> {
    if !extent.is_finite() {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Search extent must be finite, got: {}",
            extent
        )));
    }
    if extent < 0.0 {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Search extent must not be negative, got: {}",
            extent
        )));
    }
    Ok(())
}

pub fn validate_max_results(max_results: usize) -> Result<()> {
    if max_results == 0 {
        return Err(TileProbeError::InvalidQueryParameter(
            "maxResults must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Rejects a tile range covering more than `max_tiles` tiles.
///
/// ```
/// use tileprobe::compute::validation::validate_tile_count;
/// use tileprobe::TileRange;
///
/// assert!(validate_tile_count(&TileRange::new(0, 0, 1, 1, 4), 4).is_ok());
/// assert!(validate_tile_count(&TileRange::new(0, 0, 2, 1, 4), 4).is_err());
/// ```
pub fn validate_tile_count(range: &TileRange, max_tiles: usize) -> Result<()> {
    let tiles = range.len();
    if tiles > max_tiles {
        return Err(TileProbeError::InvalidQueryParameter(format!(
            "Request covers {} tiles at zoom {}, limit is {}",
            tiles, range.z, max_tiles
        )));
    }
    Ok(())
}

/// Validates a geographic viewport (x = longitude, y = latitude).
pub fn validate_viewport(bounds: &BoundingBox2D) -> Result<()> {
    validate_geographic_point(&Point::new(bounds.min_x(), bounds.min_y()))?;
    validate_geographic_point(&Point::new(bounds.max_x(), bounds.max_y()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_point_rejected() {
        let err = validate_geographic_point(&Point::new(f64::NAN, 0.0)).unwrap_err();
        assert!(matches!(err, TileProbeError::InvalidQueryParameter(_)));
    }

    #[test]
    fn test_max_results() {
        assert!(validate_max_results(1).is_ok());
        assert!(validate_max_results(0).is_err());
    }

    #[test]
    fn test_tile_count_limit() {
        let range = TileRange::new(-3906, -3906, 3906, 3906, 0);
        let err = validate_tile_count(&range, 1024).unwrap_err();
        assert!(matches!(err, TileProbeError::InvalidQueryParameter(_)));
        assert!(validate_tile_count(&TileRange::new(0, 0, 31, 31, 0), 1024).is_ok());
    }

    #[test]
    fn test_viewport() {
        assert!(validate_viewport(&BoundingBox2D::new(11.9, 57.6, 12.0, 57.8)).is_ok());
        assert!(validate_viewport(&BoundingBox2D::new(11.9, 57.6, 190.0, 57.8)).is_err());
    }
}
