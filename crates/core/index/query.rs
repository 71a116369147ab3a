//! Query options, results and the search step.

use crate::compute::spatial::{contains_strictly, rank_by_distance};
use crate::index::store::FeatureStore;
use geo::Point;
use std::sync::Arc;
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::feature::{Feature, FeatureId};

/// Per-query switches.
///
/// ```
/// use tileprobe::index::QueryOptions;
///
/// let options = QueryOptions::new().only_inside(true).max_results(3);
/// assert!(options.only_inside);
/// assert_eq!(options.max_results, Some(3));
/// assert!(!options.escalate);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Accept polygons only when the location lies strictly inside them,
    /// with no distance cutoff. Other geometries are always accepted.
    pub only_inside: bool,
    /// Result cap; the configured default when `None`.
    pub max_results: Option<usize>,
    /// Double the extent while nothing is found, up to the configured ceiling.
    pub escalate: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_inside(mut self, only_inside: bool) -> Self {
        self.only_inside = only_inside;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn escalate(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }
}

/// One ranked result.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: Option<FeatureId>,
    pub feature: Arc<Feature>,
    /// Squared pixel distance, at the effective zoom, from the query location
    /// to the center of the feature's bounding box.
    pub distance_sq: f64,
}

impl QueryHit {
    pub fn distance(&self) -> f64 {
        self.distance_sq.sqrt()
    }
}

/// Where a query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryPhase {
    Idle,
    TilesPending,
    Searching,
    Escalating,
    Done,
}

impl QueryPhase {
    pub(crate) fn advance(&mut self, next: QueryPhase) {
        log::trace!("Query {:?} -> {:?}", self, next);
        *self = next;
    }
}

/// Everything the search step needs, in the pixel frame of one zoom.
pub(crate) struct SearchRequest<'a> {
    /// Query location in lon/lat, for containment tests.
    pub location: &'a Point,
    /// Query location in pixels.
    pub pixel: Point,
    /// Search half-width in pixels.
    pub extent: f64,
    pub only_inside: bool,
    pub max_results: usize,
}

/// Range search, refine, rank and truncate.
///
/// Candidates come from the bounding-box search in both modes; containment
/// only replaces the distance cutoff.
pub(crate) fn search(store: &FeatureStore, request: &SearchRequest<'_>) -> Vec<QueryHit> {
    let window = BoundingBox2D::around(&request.pixel, request.extent);
    let tolerance_sq = request.extent * request.extent;

    let mut ranked: Vec<(f64, (u64, QueryHit))> = store
        .search(&window)
        .filter(|record| !request.only_inside || contains_strictly(&record.feature.geometry, request.location))
        .map(|record| {
            let distance_sq = record.bbox.center_distance_sq(&request.pixel);
            let hit = QueryHit {
                id: record.id.clone(),
                feature: Arc::clone(&record.feature),
                distance_sq,
            };
            (distance_sq, (record.seq, hit))
        })
        .filter(|(distance_sq, _)| request.only_inside || *distance_sq < tolerance_sq)
        .collect();

    // The tree yields in no particular order; insertion order breaks ties.
    ranked.sort_by_key(|(_, (seq, _))| *seq);
    rank_by_distance(&mut ranked);
    ranked.truncate(request.max_results);
    ranked.into_iter().map(|(_, (_, hit))| hit).collect()
}
