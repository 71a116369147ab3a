//! Geographic <-> pixel-space projection.
//!
//! Pixel space at zoom `z` spans `tile_size * 2^z` pixels on each axis with
//! the origin at the north-west corner, the frame tile coordinates are cut
//! from.

use geo::Point;
use std::f64::consts::PI;
use tileprobe_types::bbox::BoundingBox2D;

/// Maps lon/lat to pixel space and back. Both directions must agree within
/// floating point tolerance for tile math to be correct.
pub trait Projection: Send + Sync {
    fn project(&self, lon_lat: &Point, zoom: u8) -> Point;

    fn unproject(&self, pixel: &Point, zoom: u8) -> Point;

    /// Project a geographic box by its two corners.
    fn project_bbox(&self, bbox: &BoundingBox2D, zoom: u8) -> BoundingBox2D {
        let a = self.project(&Point::new(bbox.min_x(), bbox.min_y()), zoom);
        let b = self.project(&Point::new(bbox.max_x(), bbox.max_y()), zoom);
        BoundingBox2D::new(a.x(), a.y(), b.x(), b.y())
    }
}

/// Spherical (web) mercator, the projection slippy-map tiles are cut in.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    tile_size: u32,
}

impl WebMercator {
    pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    #[inline]
    fn scale(&self, zoom: u8) -> f64 {
        self.tile_size as f64 * 2f64.powi(zoom as i32)
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Projection for WebMercator {
    fn project(&self, lon_lat: &Point, zoom: u8) -> Point {
        let scale = self.scale(zoom);
        let lat = lon_lat
            .y()
            .clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE)
            .to_radians();
        let sin = lat.sin();

        let x = (lon_lat.x() + 180.0) / 360.0 * scale;
        let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * scale;
        Point::new(x, y)
    }

    fn unproject(&self, pixel: &Point, zoom: u8) -> Point {
        let scale = self.scale(zoom);
        let lon = pixel.x() / scale * 360.0 - 180.0;
        let n = PI - 2.0 * PI * pixel.y() / scale;
        let lat = n.sinh().atan().to_degrees();
        Point::new(lon, lat)
    }
}
