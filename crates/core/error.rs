//! Error types for tileprobe.
//!
//! Only [`TileProbeError::InvalidQueryParameter`] and configuration errors are
//! ever returned to query callers. Fetch, decode and join failures are scoped
//! to one tile or one feature; the index records them, reports them as
//! [`IndexEvent`](crate::index::IndexEvent)s and carries on with partial data.

use tileprobe_types::feature::FeatureId;
use tileprobe_types::tile::TileKey;

pub type Result<T> = std::result::Result<T, TileProbeError>;

#[derive(Debug, thiserror::Error)]
pub enum TileProbeError {
    /// Network or transport failure while fetching a tile.
    #[error("failed to fetch {url}: {cause}")]
    FetchFailure { url: String, cause: String },

    /// The tile payload could not be decoded.
    #[error("failed to decode tile {key}: {cause}")]
    DecodeFailure { key: TileKey, cause: String },

    /// Two fragments of the same feature cannot be merged.
    #[error("invalid join of geometry types {added} and {existing} for feature {identity}")]
    GeometryJoinFailure {
        identity: FeatureId,
        existing: &'static str,
        added: &'static str,
    },

    #[error("invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl TileProbeError {
    pub(crate) fn fetch(url: &str, cause: impl std::fmt::Display) -> Self {
        TileProbeError::FetchFailure {
            url: url.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn decode(key: TileKey, cause: impl std::fmt::Display) -> Self {
        TileProbeError::DecodeFailure {
            key,
            cause: cause.to_string(),
        }
    }
}
