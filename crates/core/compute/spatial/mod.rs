pub mod algorithms;
pub use algorithms::{
    JoinOutcome, contains_strictly, join_geometries, rank_by_distance, ring_count,
};

pub mod rtree;
pub use rtree::{FeatureIndex, IndexedFeature};
