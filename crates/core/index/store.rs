//! Identity tracking and cross-tile joins on top of the R*-tree.
//!
//! The tree owns the records; `by_id` is only a lookup from identity to the
//! record currently stored for it. Both are mutated together, under the
//! index write lock, so they never disagree.

use crate::compute::spatial::{FeatureIndex, IndexedFeature, JoinOutcome, join_geometries};
use crate::config::FeatureMode;
use crate::error::TileProbeError;
use geo::Geometry;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::feature::{Feature, FeatureId};

/// What happened to one decoded feature.
#[derive(Debug)]
pub(crate) enum IngestOutcome {
    /// Net-new record.
    Inserted(Arc<Feature>),
    /// Geometry merged into an existing record.
    Merged(Arc<Feature>),
    /// Already known, or nothing indexable.
    Dropped,
    /// Join failed; the existing record is untouched.
    Rejected(TileProbeError),
}

pub(crate) struct FeatureStore {
    mode: FeatureMode,
    index: FeatureIndex,
    by_id: FxHashMap<FeatureId, IndexedFeature>,
    next_seq: u64,
}

impl FeatureStore {
    pub(crate) fn new(mode: FeatureMode) -> Self {
        Self {
            mode,
            index: FeatureIndex::new(),
            by_id: FxHashMap::default(),
            next_seq: 0,
        }
    }

    /// Add one decoded feature. `bbox_of` maps a geometry to its pixel-space
    /// box at the current zoom.
    pub(crate) fn ingest<F>(&mut self, id: Option<FeatureId>, feature: Feature, bbox_of: F) -> IngestOutcome
    where
        F: Fn(&Geometry) -> Option<BoundingBox2D>,
    {
        let Some(id) = id else {
            return self.insert_new(None, feature, &bbox_of);
        };

        let Some(existing) = self.by_id.get(&id).cloned() else {
            return self.insert_new(Some(id), feature, &bbox_of);
        };

        match self.mode {
            FeatureMode::Dedup => IngestOutcome::Dropped,
            FeatureMode::Join => self.join(id, existing, feature, &bbox_of),
        }
    }

    fn insert_new<F>(&mut self, id: Option<FeatureId>, feature: Feature, bbox_of: &F) -> IngestOutcome
    where
        F: Fn(&Geometry) -> Option<BoundingBox2D>,
    {
        let Some(bbox) = bbox_of(&feature.geometry) else {
            log::debug!("Skipping feature {:?} with empty geometry", id);
            return IngestOutcome::Dropped;
        };

        let feature = Arc::new(feature);
        let record = IndexedFeature::new(bbox, id.clone(), self.next_seq, Arc::clone(&feature));
        if !self.index.insert(record.clone()) {
            return IngestOutcome::Dropped;
        }
        self.next_seq += 1;

        if let Some(id) = id {
            self.by_id.insert(id, record);
        }
        IngestOutcome::Inserted(feature)
    }

    fn join<F>(&mut self, id: FeatureId, existing: IndexedFeature, added: Feature, bbox_of: &F) -> IngestOutcome
    where
        F: Fn(&Geometry) -> Option<BoundingBox2D>,
    {
        let geometry = match join_geometries(&existing.feature.geometry, &added.geometry) {
            JoinOutcome::Merged(geometry) => geometry,
            JoinOutcome::Unchanged => return IngestOutcome::Dropped,
            JoinOutcome::Incompatible => {
                return IngestOutcome::Rejected(TileProbeError::GeometryJoinFailure {
                    identity: id,
                    existing: existing.feature.geometry_type(),
                    added: added.geometry_type(),
                });
            }
        };

        let merged = Arc::new(Feature::new(
            existing.feature.layer.clone(),
            geometry,
            existing.feature.properties.clone(),
        ));

        let Some(bbox) = bbox_of(&merged.geometry).filter(BoundingBox2D::is_finite) else {
            return IngestOutcome::Dropped;
        };

        if bbox == existing.bbox {
            self.index.replace_feature(&existing, Arc::clone(&merged));
            if let Some(entry) = self.by_id.get_mut(&id) {
                entry.feature = Arc::clone(&merged);
            }
        } else {
            self.index.remove(&existing);
            let record = IndexedFeature::new(bbox, Some(id.clone()), existing.seq, Arc::clone(&merged));
            self.index.insert(record.clone());
            self.by_id.insert(id, record);
        }

        IngestOutcome::Merged(merged)
    }

    pub(crate) fn search<'a>(&'a self, window: &BoundingBox2D) -> impl Iterator<Item = &'a IndexedFeature> + 'a {
        self.index.search(window)
    }

    pub(crate) fn get(&self, id: &FeatureId) -> Option<&IndexedFeature> {
        self.by_id.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn identities(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.by_id.clear();
        self.next_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::spatial::ring_count;
    use geo::{Polygon, point, polygon};
    use serde_json::{Map, json};

    fn planar(geometry: &Geometry) -> Option<BoundingBox2D> {
        BoundingBox2D::of_geometry(geometry)
    }

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    fn feature(geometry: Geometry, name: &str) -> Feature {
        let mut props = Map::new();
        props.insert("name".into(), json!(name));
        Feature::new("landuse", geometry, props)
    }

    #[test]
    fn test_dedup_keeps_first_sighting() {
        let mut store = FeatureStore::new(FeatureMode::Dedup);
        let id = FeatureId::Int(1);
        let first = store.ingest(Some(id.clone()), feature(point!(x: 1.0, y: 1.0).into(), "a"), planar);
        let second = store.ingest(Some(id.clone()), feature(point!(x: 1.0, y: 1.0).into(), "b"), planar);

        assert!(matches!(first, IngestOutcome::Inserted(_)));
        assert!(matches!(second, IngestOutcome::Dropped));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().feature.property("name"), Some(&json!("a")));
    }

    #[test]
    fn test_join_polygons_moves_record() {
        let mut store = FeatureStore::new(FeatureMode::Join);
        let id = FeatureId::Int(9);
        store.ingest(Some(id.clone()), feature(square(0.0, 0.0, 1.0).into(), "left"), planar);
        let outcome = store.ingest(Some(id.clone()), feature(square(1.0, 0.0, 1.0).into(), "right"), planar);

        let IngestOutcome::Merged(merged) = outcome else {
            panic!("expected merge, got {:?}", outcome);
        };
        assert_eq!(ring_count(&merged.geometry), 2);
        assert_eq!(merged.property("name"), Some(&json!("left")));

        assert_eq!(store.len(), 1);
        let record = store.get(&id).unwrap();
        assert_eq!(record.bbox, BoundingBox2D::new(0.0, 0.0, 2.0, 1.0));
        let hits: Vec<_> = store.search(&BoundingBox2D::new(1.8, 0.5, 1.9, 0.6)).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_join_within_same_box_updates_in_place() {
        let mut store = FeatureStore::new(FeatureMode::Join);
        let id = FeatureId::Int(3);
        store.ingest(Some(id.clone()), feature(square(0.0, 0.0, 4.0).into(), "outer"), planar);
        let outcome = store.ingest(Some(id.clone()), feature(square(1.0, 1.0, 1.0).into(), "inner"), planar);

        assert!(matches!(outcome, IngestOutcome::Merged(_)));
        assert_eq!(store.len(), 1);
        let stored = store.search(&BoundingBox2D::new(0.0, 0.0, 4.0, 4.0)).next().unwrap();
        assert_eq!(ring_count(&stored.feature.geometry), 2);
        assert_eq!(ring_count(&store.get(&id).unwrap().feature.geometry), 2);
    }

    #[test]
    fn test_incompatible_join_leaves_original() {
        let mut store = FeatureStore::new(FeatureMode::Join);
        let id = FeatureId::Str("way/12".into());
        store.ingest(Some(id.clone()), feature(square(0.0, 0.0, 1.0).into(), "poly"), planar);
        let outcome = store.ingest(Some(id.clone()), feature(point!(x: 5.0, y: 5.0).into(), "pt"), planar);

        match outcome {
            IngestOutcome::Rejected(TileProbeError::GeometryJoinFailure { identity, existing, added }) => {
                assert_eq!(identity, id);
                assert_eq!(existing, "Polygon");
                assert_eq!(added, "Point");
            }
            other => panic!("expected join failure, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().bbox, BoundingBox2D::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_join_points_is_dedup() {
        let mut store = FeatureStore::new(FeatureMode::Join);
        let id = FeatureId::Int(4);
        store.ingest(Some(id.clone()), feature(point!(x: 1.0, y: 1.0).into(), "a"), planar);
        let outcome = store.ingest(Some(id), feature(point!(x: 1.0, y: 1.0).into(), "b"), planar);
        assert!(matches!(outcome, IngestOutcome::Dropped));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_identity_less_always_inserted() {
        let mut store = FeatureStore::new(FeatureMode::Dedup);
        for _ in 0..3 {
            let outcome = store.ingest(None, feature(point!(x: 2.0, y: 2.0).into(), "anon"), planar);
            assert!(matches!(outcome, IngestOutcome::Inserted(_)));
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.identities(), 0);
    }

    #[test]
    fn test_clear() {
        let mut store = FeatureStore::new(FeatureMode::Dedup);
        store.ingest(Some(FeatureId::Int(1)), feature(point!(x: 0.0, y: 0.0).into(), "a"), planar);
        store.clear();
        assert_eq!(store.len(), 0);
        assert!(store.get(&FeatureId::Int(1)).is_none());
    }
}
