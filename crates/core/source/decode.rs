//! Turning tile payloads into features.
//!
//! A decode failure is a failure of the whole tile: the loader reports it
//! exactly like a failed fetch.

use crate::compute::geojson::features_from_geojson;
use crate::error::{Result, TileProbeError};
use bytes::Bytes;
use geojson::GeoJson;
use tileprobe_types::feature::Feature;
use tileprobe_types::tile::TileKey;

/// The features of one layer of a decoded tile, in lon/lat.
pub struct DecodedLayer {
    pub name: String,
    pub features: Box<dyn Iterator<Item = Feature> + Send>,
}

impl DecodedLayer {
    pub fn new<I>(name: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
        I::IntoIter: Send + 'static,
    {
        Self {
            name: name.into(),
            features: Box::new(features.into_iter()),
        }
    }
}

impl std::fmt::Debug for DecodedLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedLayer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub trait TileDecoder: Send + Sync {
    /// Decode `bytes` of tile `key`, returning the layers named in `layers`
    /// that are present (every layer when `layers` is empty).
    fn decode(&self, key: TileKey, bytes: &Bytes, layers: &[String]) -> Result<Vec<DecodedLayer>>;
}

pub(crate) fn wants_layer(layers: &[String], name: &str) -> bool {
    layers.is_empty() || layers.iter().any(|l| l == name)
}

/// Decodes tiles stored as a JSON object mapping layer name to a GeoJSON
/// document in lon/lat:
///
/// ```json
/// {"poi_label": {"type": "FeatureCollection", "features": []}}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonDecoder;

impl GeoJsonDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl TileDecoder for GeoJsonDecoder {
    fn decode(&self, key: TileKey, bytes: &Bytes, layers: &[String]) -> Result<Vec<DecodedLayer>> {
        let document: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(bytes).map_err(|e| TileProbeError::decode(key, e))?;

        let mut decoded = Vec::new();
        for (name, value) in document {
            if !wants_layer(layers, &name) {
                continue;
            }
            let geojson = GeoJson::from_json_value(value)
                .map_err(|e| TileProbeError::decode(key, format!("layer {}: {}", name, e)))?;
            let features = features_from_geojson(&name, geojson)
                .map_err(|e| TileProbeError::decode(key, format!("layer {}: {}", name, e)))?;
            decoded.push(DecodedLayer::new(name, features));
        }
        Ok(decoded)
    }
}
