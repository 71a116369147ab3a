use serde_json::{Value, json};
use std::collections::HashMap;
use tileprobe::compute::projection::{Projection, WebMercator};
use tileprobe::prelude::*;
use tileprobe::source::{FileFetcher, GeoJsonDecoder};

const ZOOM: u8 = 14;
const TILE_SIZE: u32 = 256;

/// Points of interest around the Stockholm old town, in lon/lat.
const PLACES: &[(i64, &str, f64, f64)] = &[
    (1, "Storkyrkan", 18.0706, 59.3258),
    (2, "Kungliga slottet", 18.0716, 59.3268),
    (3, "Stortorget", 18.0707, 59.3250),
    (4, "Riddarholmskyrkan", 18.0645, 59.3247),
    (5, "Stadshuset", 18.0543, 59.3275),
];

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=tileprobe=debug to follow tile loading
    env_logger::init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run())
}

async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== tileprobe - Nearby Features ===\n");

    // Cut the places into GeoJSON tiles the way a tile server would.
    let dir = tempfile::tempdir()?;
    let projection = WebMercator::new(TILE_SIZE);
    let mut tiles: HashMap<(i64, i64), Vec<Value>> = HashMap::new();
    for &(id, name, lon, lat) in PLACES {
        let pixel = projection.project(&Point::new(lon, lat), ZOOM);
        let tile = (
            (pixel.x() / TILE_SIZE as f64).floor() as i64,
            (pixel.y() / TILE_SIZE as f64).floor() as i64,
        );
        tiles.entry(tile).or_default().push(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [lon, lat]},
            "properties": {"osm_id": id, "name": name},
        }));
    }
    for ((x, y), features) in &tiles {
        let path = dir.path().join(format!("{}/{}", ZOOM, x));
        std::fs::create_dir_all(&path)?;
        let payload = json!({"poi": {"type": "FeatureCollection", "features": features}});
        std::fs::write(path.join(format!("{}.json", y)), payload.to_string())?;
    }
    println!("Wrote {} tiles to {}\n", tiles.len(), dir.path().display());

    let index = TileIndex::builder()
        .config(
            Config::default()
                .with_layers(["poi"])
                .with_tile_size(TILE_SIZE)
                .with_escalation(EscalationConfig::new(8.0, 512.0)),
        )
        .fetcher(FileFetcher::with_root(dir.path()))
        .decoder(GeoJsonDecoder)
        .url_template("{z}/{x}/{y}.json")
        .zoom(ZOOM)
        .build()?;

    let here = Point::new(18.0708, 59.3256);

    println!("1. Within 40 pixels of ({}, {})", here.x(), here.y());
    let hits = index.query(here, Some(40.0), QueryOptions::new()).await?;
    print_hits(&hits);

    println!("2. Nearest two");
    let hits = index
        .query(here, Some(200.0), QueryOptions::new().max_results(2))
        .await?;
    print_hits(&hits);

    println!("3. Escalating from a point with nothing close by");
    let far = Point::new(18.0500, 59.3280);
    let hits = index
        .query(far, None, QueryOptions::new().escalate(true))
        .await?;
    print_hits(&hits);

    let stats = index.stats();
    println!(
        "Loaded {} tiles ({} fetches), indexed {} features",
        stats.tiles.loaded, stats.fetches, stats.features
    );
    Ok(())
}

fn print_hits(hits: &[QueryHit]) {
    if hits.is_empty() {
        println!("   (nothing found)");
    }
    for hit in hits {
        let name = hit
            .feature
            .property("name")
            .and_then(Value::as_str)
            .unwrap_or("?");
        println!("   - {:<20} {:>8.1} px", name, hit.distance());
    }
    println!();
}
