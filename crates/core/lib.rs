//! On-demand spatial index over tiled vector data.
//!
//! ## Features
//! - **Lazy tile loading**: only the tiles a query touches are fetched, once
//!   per session, closest to the query first
//! - **R*-tree search**: decoded features are indexed by their pixel-space
//!   bounding box
//! - **Dedup and join**: features repeated across tile borders are kept once,
//!   or their polygon fragments merged into one feature
//! - **Escalation**: a query that finds nothing can retry with a growing extent
//! - **Containment**: "only inside" queries keep polygons that strictly contain
//!   the query location
//!
//! ## Sessions
//! All loaded tiles and indexed features belong to one session. Changing the
//! effective zoom or calling [`TileIndex::reset`] ends it: tile state, the
//! R*-tree and identity tracking are dropped together, and the next query
//! fetches again.
//!
//! ```rust
//! use tileprobe::prelude::*;
//! use tileprobe::source::{FileFetcher, GeoJsonDecoder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tileprobe::Result<()> {
//! let dir = std::env::temp_dir().join("tileprobe-doc");
//! std::fs::create_dir_all(dir.join("0/0"))?;
//! std::fs::write(
//!     dir.join("0/0/0.json"),
//!     r#"{"poi": {"type": "FeatureCollection", "features": [
//!         {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
//!          "properties": {"osm_id": 1, "name": "Null Island"}}
//!     ]}}"#,
//! )?;
//!
//! let index = TileIndex::builder()
//!     .config(Config::default().with_layers(["poi"]))
//!     .fetcher(FileFetcher::with_root(&dir))
//!     .decoder(GeoJsonDecoder)
//!     .url_template("{z}/{x}/{y}.json")
//!     .build()?;
//!
//! let hits = index
//!     .query(Point::new(0.0, 0.0), Some(10.0), QueryOptions::new())
//!     .await?;
//! assert_eq!(hits[0].feature.property("name"), Some(&serde_json::json!("Null Island")));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod source;

pub use builder::TileIndexBuilder;
pub use error::{Result, TileProbeError};
pub use index::{
    EventReceiver, IndexEvent, IndexStats, QueryHit, QueryOptions, TileIndex, property_identity,
};

pub use config::{Config, EscalationConfig, FeatureMode, LoadingMode};

pub use geo::Point;
pub use tileprobe_types::bbox::BoundingBox2D;
pub use tileprobe_types::feature::{Feature, FeatureId};
pub use tileprobe_types::tile::{TileKey, TileRange, TileState};

// Re-export GeoJSON conversion and validation utilities
pub use compute::geojson;
pub use compute::validation;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{Result, TileIndex, TileIndexBuilder, TileProbeError};

    pub use crate::{Config, EscalationConfig, FeatureMode, LoadingMode};

    pub use crate::{IndexEvent, QueryHit, QueryOptions};

    pub use crate::{BoundingBox2D, Feature, FeatureId, Point, TileKey};
}
