use geo::{BoundingRect, Geometry, Point, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box.
///
/// Used both for geographic extents (lon/lat) and for projected pixel-space
/// boxes at a given zoom. Corners are normalized on construction, so callers
/// may pass them in any order (projected y grows southwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl BoundingBox2D {
    /// Create a new bounding box from two opposite corners.
    ///
    /// # Examples
    ///
    /// ```
    /// use tileprobe_types::bbox::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new(10.0, 40.0, 0.0, 20.0);
    /// assert_eq!(bbox.min_x(), 0.0);
    /// assert_eq!(bbox.max_y(), 40.0);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create a bounding box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    /// Square box of half-width `half` centered on `center`.
    pub fn around(center: &Point, half: f64) -> Self {
        Self::new(
            center.x() - half,
            center.y() - half,
            center.x() + half,
            center.y() + half,
        )
    }

    /// Bounding box of a geometry, `None` for empty geometries.
    pub fn of_geometry(geometry: &Geometry) -> Option<Self> {
        geometry.bounding_rect().map(Self::from_rect)
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Get the center point of the bounding box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x() + self.max_x()) / 2.0,
            (self.min_y() + self.max_y()) / 2.0,
        )
    }

    /// Squared euclidean distance from `point` to the center of this box.
    pub fn center_distance_sq(&self, point: &Point) -> f64 {
        let center = self.center();
        let dx = center.x() - point.x();
        let dy = center.y() - point.y();
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        [self.min_x(), self.min_y(), self.max_x(), self.max_y()]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, polygon};

    #[test]
    fn test_bbox_normalizes_corners() {
        let bbox = BoundingBox2D::new(10.0, 5.0, 0.0, -5.0);
        assert_eq!(bbox.min_x(), 0.0);
        assert_eq!(bbox.min_y(), -5.0);
        assert_eq!(bbox.max_x(), 10.0);
        assert_eq!(bbox.max_y(), 5.0);
    }

    #[test]
    fn test_bbox_around() {
        let bbox = BoundingBox2D::around(&Point::new(100.0, 50.0), 3.0);
        assert_eq!(bbox.min_x(), 97.0);
        assert_eq!(bbox.max_y(), 53.0);
        assert_eq!(bbox.center(), Point::new(100.0, 50.0));
    }

    #[test]
    fn test_bbox_of_geometry() {
        let poly: Geometry = polygon![
            (x: 1.0, y: 2.0),
            (x: 4.0, y: 2.0),
            (x: 4.0, y: 7.0),
            (x: 1.0, y: 2.0),
        ]
        .into();
        let bbox = BoundingBox2D::of_geometry(&poly).unwrap();
        assert_eq!(bbox, BoundingBox2D::new(1.0, 2.0, 4.0, 7.0));

        let empty: Geometry = geo::MultiPoint::<f64>::new(vec![]).into();
        assert!(BoundingBox2D::of_geometry(&empty).is_none());
    }

    #[test]
    fn test_center_distance_sq() {
        let bbox = BoundingBox2D::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(bbox.center_distance_sq(&Point::new(0.0, 0.0)), 200.0);
        let degenerate = BoundingBox2D::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(degenerate.center_distance_sq(&Point::new(0.0, 0.0)), 0.0);
    }
}
