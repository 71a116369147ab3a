//! Geometry operations using the geo crate.

use geo::{Contains, Geometry, MultiPolygon, Point, Polygon};
use std::cmp::Ordering;

/// Result of merging a newly decoded fragment into an existing geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The fragments were combined into this geometry.
    Merged(Geometry),
    /// Nothing to merge (both are points); the existing geometry stands.
    Unchanged,
    /// The geometry types cannot be combined.
    Incompatible,
}

/// Merge two fragments of the same feature.
///
/// - Polygon/MultiPolygon with Polygon/MultiPolygon: rings are concatenated
///   into one MultiPolygon, existing polygons first.
/// - Point with Point: already resolved, [`JoinOutcome::Unchanged`].
/// - Anything else: [`JoinOutcome::Incompatible`].
///
/// # Examples
///
/// ```
/// use geo::{Geometry, polygon};
/// use tileprobe::compute::spatial::{JoinOutcome, join_geometries};
///
/// let a: Geometry = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)].into();
/// let b: Geometry = polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 0.0)].into();
///
/// match join_geometries(&a, &b) {
///     JoinOutcome::Merged(Geometry::MultiPolygon(mp)) => assert_eq!(mp.0.len(), 2),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn join_geometries(existing: &Geometry, added: &Geometry) -> JoinOutcome {
    match (existing, added) {
        (Geometry::Point(_), Geometry::Point(_)) => JoinOutcome::Unchanged,
        _ => match (polygons_of(existing), polygons_of(added)) {
            (Some(mut polygons), Some(more)) => {
                polygons.extend(more);
                JoinOutcome::Merged(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
            _ => JoinOutcome::Incompatible,
        },
    }
}

fn polygons_of(geometry: &Geometry) -> Option<Vec<Polygon>> {
    match geometry {
        Geometry::Polygon(p) => Some(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => Some(mp.0.clone()),
        _ => None,
    }
}

/// Number of linear rings in an areal geometry, 0 for everything else.
pub fn ring_count(geometry: &Geometry) -> usize {
    let rings = |p: &Polygon| 1 + p.interiors().len();
    match geometry {
        Geometry::Polygon(p) => rings(p),
        Geometry::MultiPolygon(mp) => mp.0.iter().map(rings).sum(),
        _ => 0,
    }
}

/// Containment gate for "only inside" queries.
///
/// Polygons and multipolygons pass only when `point` lies strictly inside
/// them (the boundary does not count). Every other geometry type passes.
pub fn contains_strictly(geometry: &Geometry, point: &Point) -> bool {
    match geometry {
        Geometry::Polygon(p) => p.contains(point),
        Geometry::MultiPolygon(mp) => mp.contains(point),
        _ => true,
    }
}

/// Stable ascending sort of `(distance_sq, item)` pairs, NaN last.
pub fn rank_by_distance<T>(candidates: &mut [(f64, T)]) {
    candidates.sort_by(|(a, _), (b, _)| match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
}
