use serde::{Deserialize, Serialize};

/// How repeated sightings of the same feature identity are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// Keep the first sighting, drop every later one.
    #[default]
    Dedup,
    /// Merge area fragments split across tiles into one feature.
    Join,
}

/// Which tiles get loaded, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadingMode {
    /// Load only the tiles a query needs, when it needs them.
    #[default]
    Lazy,
    /// Also load every tile intersecting the current viewport.
    Eager,
}
