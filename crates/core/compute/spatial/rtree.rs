//! Bounding-box index over decoded features, backed by an R*-tree.
//!
//! The index owns its records. Callers keep identity lookups elsewhere and go
//! through [`FeatureIndex::remove`] + [`FeatureIndex::insert`] whenever a
//! record's box changes; the tree is never mutated in a way that could move an
//! envelope.

use rstar::{AABB, RTree, RTreeObject};
use std::sync::Arc;
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::feature::{Feature, FeatureId};

/// One feature as stored in the tree: its pixel-space box, its identity and
/// the shared feature payload.
#[derive(Debug, Clone)]
pub struct IndexedFeature {
    pub bbox: BoundingBox2D,
    pub id: Option<FeatureId>,
    /// Insertion sequence number; tells identity-less records apart.
    pub seq: u64,
    pub feature: Arc<Feature>,
}

impl IndexedFeature {
    pub fn new(bbox: BoundingBox2D, id: Option<FeatureId>, seq: u64, feature: Arc<Feature>) -> Self {
        Self {
            bbox,
            id,
            seq,
            feature,
        }
    }
}

// Exact match on box and identity, which is what removal is keyed on.
impl PartialEq for IndexedFeature {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.id == other.id && self.bbox == other.bbox
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope_of(&self.bbox)
    }
}

#[inline]
fn envelope_of(bbox: &BoundingBox2D) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x(), bbox.min_y()], [bbox.max_x(), bbox.max_y()])
}

/// Mutable R*-tree of [`IndexedFeature`]s.
#[derive(Default)]
pub struct FeatureIndex {
    tree: RTree<IndexedFeature>,
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
        }
    }

    /// Insert a record. Records with non-finite boxes are rejected.
    pub fn insert(&mut self, record: IndexedFeature) -> bool {
        if !record.bbox.is_finite() {
            log::warn!(
                "Rejecting feature {:?} with non-finite bounding box",
                record.id
            );
            return false;
        }
        self.tree.insert(record);
        true
    }

    /// All records whose box intersects `query` (touching edges included).
    ///
    /// Unordered and free of duplicates; callers refine with exact tests.
    pub fn search<'a>(
        &'a self,
        query: &BoundingBox2D,
    ) -> impl Iterator<Item = &'a IndexedFeature> + 'a {
        self.tree
            .locate_in_envelope_intersecting(&envelope_of(query))
    }

    /// Remove the record matching `record` on box, identity and sequence.
    pub fn remove(&mut self, record: &IndexedFeature) -> Option<IndexedFeature> {
        self.tree.remove(record)
    }

    /// Swap the payload of a record in place. The box is left untouched, so
    /// this is only valid when the new payload has the same bounds.
    pub fn replace_feature(&mut self, record: &IndexedFeature, feature: Arc<Feature>) -> bool {
        let envelope = envelope_of(&record.bbox);
        match self
            .tree
            .locate_in_envelope_intersecting_mut(&envelope)
            .find(|candidate| **candidate == *record)
        {
            Some(stored) => {
                stored.feature = feature;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    #[cfg(test)]
    fn iter(&self) -> impl Iterator<Item = &IndexedFeature> {
        self.tree.iter()
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }
}
