//! Mapbox Vector Tile decoding.
//!
//! Tile-local coordinates (`0..extent`, y pointing down) are placed in the
//! pixel frame of the tile's zoom and unprojected to lon/lat, so decoded
//! features share the frame of every other feature in the index.

use crate::compute::projection::{Projection, WebMercator};
use crate::error::{Result, TileProbeError};
use crate::source::decode::{DecodedLayer, TileDecoder, wants_layer};
use bytes::Bytes;
use flate2::read::GzDecoder;
use geo::{Coord, MapCoords, Point};
use geozero::ToGeo;
use geozero::mvt::{Message, Tile, tile};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;
use tileprobe_types::feature::Feature;
use tileprobe_types::tile::TileKey;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Clone)]
pub struct MvtDecoder {
    tile_size: u32,
    projection: Arc<dyn Projection>,
}

impl MvtDecoder {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            projection: Arc::new(WebMercator::new(tile_size)),
        }
    }

    pub fn with_projection(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projection = projection;
        self
    }

    fn to_lon_lat(&self, key: TileKey, extent: f64, c: Coord) -> Coord {
        let origin = key.pixel_origin(self.tile_size);
        let size = self.tile_size as f64;
        let pixel = Point::new(
            origin.x() + c.x / extent * size,
            origin.y() + c.y / extent * size,
        );
        self.projection.unproject(&pixel, key.z).0
    }

    fn decode_layer(&self, key: TileKey, layer: tile::Layer) -> Result<DecodedLayer> {
        let extent = layer.extent() as f64;
        let mut features = Vec::with_capacity(layer.features.len());

        for feature in &layer.features {
            if feature.r#type() == tile::GeomType::Unknown {
                continue;
            }
            let geometry = feature
                .to_geo()
                .map_err(|e| TileProbeError::decode(key, format!("layer {}: {}", layer.name, e)))?;
            let geometry = geometry.map_coords(|c| self.to_lon_lat(key, extent, c));

            let mut properties = properties_of(feature, &layer.keys, &layer.values);
            if let Some(id) = feature.id {
                properties.entry("id".to_string()).or_insert(Value::from(id));
            }
            features.push(Feature::new(layer.name.clone(), geometry, properties));
        }

        Ok(DecodedLayer::new(layer.name, features))
    }
}

impl std::fmt::Debug for MvtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvtDecoder")
            .field("tile_size", &self.tile_size)
            .finish_non_exhaustive()
    }
}

impl TileDecoder for MvtDecoder {
    fn decode(&self, key: TileKey, bytes: &Bytes, layers: &[String]) -> Result<Vec<DecodedLayer>> {
        let raw = gunzip_if_needed(bytes).map_err(|e| TileProbeError::decode(key, e))?;
        let tile = Tile::decode(raw.as_ref()).map_err(|e| TileProbeError::decode(key, e))?;

        tile.layers
            .into_iter()
            .filter(|layer| wants_layer(layers, &layer.name))
            .map(|layer| self.decode_layer(key, layer))
            .collect()
    }
}

fn gunzip_if_needed(bytes: &Bytes) -> std::io::Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes.as_ref()));
    }
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes.as_ref()).read_to_end(&mut out)?;
    Ok(Cow::Owned(out))
}

fn properties_of(feature: &tile::Feature, keys: &[String], values: &[tile::Value]) -> Map<String, Value> {
    feature
        .tags
        .chunks_exact(2)
        .filter_map(|pair| {
            let key = keys.get(pair[0] as usize)?;
            let value = values.get(pair[1] as usize).and_then(json_value)?;
            Some((key.clone(), value))
        })
        .collect()
}

fn json_value(value: &tile::Value) -> Option<Value> {
    if let Some(s) = &value.string_value {
        Some(Value::String(s.clone()))
    } else if let Some(f) = value.float_value {
        serde_json::Number::from_f64(f as f64).map(Value::Number)
    } else if let Some(d) = value.double_value {
        serde_json::Number::from_f64(d).map(Value::Number)
    } else if let Some(i) = value.int_value {
        Some(Value::from(i))
    } else if let Some(u) = value.uint_value {
        Some(Value::from(u))
    } else if let Some(s) = value.sint_value {
        Some(Value::from(s))
    } else {
        value.bool_value.map(Value::Bool)
    }
}
