//! Collaborators the index consumes: where tile bytes come from and how they
//! turn into features.

pub mod decode;
pub mod fetch;
#[cfg(feature = "mvt")]
pub mod mvt;
pub mod template;

pub use decode::{DecodedLayer, GeoJsonDecoder, TileDecoder};
pub use fetch::{FileFetcher, TileFetcher};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
#[cfg(feature = "mvt")]
pub use mvt::MvtDecoder;
pub use template::TileUrlTemplate;
