//! Tile math, projection, geometry algorithms, validation, and GeoJSON conversion.

pub mod geojson;
pub mod projection;
pub mod spatial;
pub mod tiles;
pub mod validation;
