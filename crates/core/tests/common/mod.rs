#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use geo::Point;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tileprobe::compute::projection::Projection;
use tileprobe::source::{GeoJsonDecoder, TileFetcher};
use tileprobe::{Config, FeatureId, IndexEvent, Result, TileIndex, TileKey, TileProbeError};

pub const LAYER: &str = "test";
pub const TILE_SIZE: u32 = 64;

/// Pixel space is lon/lat, at every zoom.
pub struct Planar;

impl Projection for Planar {
    fn project(&self, lon_lat: &Point, _zoom: u8) -> Point {
        *lon_lat
    }

    fn unproject(&self, pixel: &Point, _zoom: u8) -> Point {
        *pixel
    }
}

#[derive(Default)]
struct Tiles {
    payloads: HashMap<String, Bytes>,
    failing: HashSet<String>,
    fetches: HashMap<String, usize>,
}

/// In-memory tile server that counts every fetch. Unknown tiles are empty.
#[derive(Clone, Default)]
pub struct MemoryFetcher {
    tiles: Arc<Mutex<Tiles>>,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn put(&self, key: TileKey, features: Vec<Value>) {
        let mut payload = serde_json::Map::new();
        payload.insert(
            LAYER.to_string(),
            json!({"type": "FeatureCollection", "features": features}),
        );
        let payload = Value::Object(payload);
        self.tiles
            .lock()
            .payloads
            .insert(url(&key), Bytes::from(payload.to_string()));
    }

    pub fn fail(&self, key: TileKey) {
        self.tiles.lock().failing.insert(url(&key));
    }

    pub fn fetches(&self, key: TileKey) -> usize {
        self.tiles.lock().fetches.get(&url(&key)).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.tiles.lock().fetches.values().sum()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.tiles.lock().fetches.keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl TileFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let (payload, failing) = {
            let mut tiles = self.tiles.lock();
            *tiles.fetches.entry(url.to_string()).or_default() += 1;
            (tiles.payloads.get(url).cloned(), tiles.failing.contains(url))
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(TileProbeError::FetchFailure {
                url: url.to_string(),
                cause: "503 Service Unavailable".to_string(),
            });
        }
        Ok(payload.unwrap_or_else(|| Bytes::from_static(b"{}")))
    }
}

pub fn url(key: &TileKey) -> String {
    format!("{}/{}/{}", key.z, key.x, key.y)
}

pub fn key(x: i64, y: i64) -> TileKey {
    TileKey::new(x, y, 0)
}

pub fn config() -> Config {
    Config::default()
        .with_layers([LAYER])
        .with_tile_size(TILE_SIZE)
}

pub fn index(fetcher: &MemoryFetcher, config: Config) -> TileIndex {
    TileIndex::builder()
        .config(config)
        .fetcher(fetcher.clone())
        .decoder(GeoJsonDecoder)
        .projection(Planar)
        .url_template("{z}/{x}/{y}")
        .build()
        .unwrap()
}

pub fn point(id: Option<i64>, x: f64, y: f64) -> Value {
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [x, y]},
        "properties": properties(id),
    })
}

/// Axis-aligned rectangle polygon.
pub fn rect(id: Option<i64>, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [min_x, min_y], [max_x, min_y], [max_x, max_y], [min_x, max_y], [min_x, min_y]
            ]]
        },
        "properties": properties(id),
    })
}

fn properties(id: Option<i64>) -> Value {
    match id {
        Some(id) => json!({"osm_id": id, "name": format!("feature {}", id)}),
        None => json!({"name": "anonymous"}),
    }
}

pub fn ids(hits: &[tileprobe::QueryHit]) -> Vec<i64> {
    hits.iter()
        .map(|hit| match &hit.id {
            Some(FeatureId::Int(id)) => *id,
            other => panic!("unexpected id {:?}", other),
        })
        .collect()
}

/// Everything currently buffered on the receiver.
pub fn drain(rx: &mut tileprobe::EventReceiver) -> Vec<IndexEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
