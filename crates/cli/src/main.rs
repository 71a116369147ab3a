mod args;

use anyhow::Context;
use args::{Args, TileFormat};
use clap::Parser;
use std::path::Path;
use tileprobe::geojson::hits_to_collection;
use tileprobe::source::{FileFetcher, GeoJsonDecoder, HttpFetcher, MvtDecoder};
use tileprobe::{
    Config, EventReceiver, FeatureMode, IndexEvent, Point, QueryOptions, TileIndex, TileIndexBuilder,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tileprobe=info,tileprobe_cli=info,warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let index = build_index(&args, config)?;
    let events = tokio::spawn(report_events(index.subscribe()));

    let options = QueryOptions {
        only_inside: args.only_inside,
        max_results: args.max_results,
        escalate: args.escalate,
    };
    let hits = index
        .query(Point::new(args.lon, args.lat), args.radius, options)
        .await?;

    let stats = index.stats();
    info!(
        "{} results; {} tiles loaded, {} failed, {} features indexed",
        hits.len(),
        stats.tiles.loaded,
        stats.tiles.failed,
        stats.features
    );

    let collection = hits_to_collection(&hits);
    println!("{}", serde_json::to_string_pretty(&collection)?);

    // The channel closes once the last handle, including in-flight tile
    // tasks, is gone.
    drop(index);
    events.await?;
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };

    if !args.layers.is_empty() {
        config.layers = args.layers.clone();
    }
    if args.join {
        config.feature_mode = FeatureMode::Join;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = if path.extension().is_some_and(|ext| ext == "json") {
        Config::from_json(&text)?
    } else {
        Config::from_toml(&text)?
    };
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn build_index(args: &Args, config: Config) -> anyhow::Result<TileIndex> {
    let tile_size = config.tile_size;
    let mut builder = TileIndexBuilder::new()
        .config(config)
        .url_template(args.tiles.clone())
        .zoom(args.zoom);

    builder = if args.tiles.starts_with("http://") || args.tiles.starts_with("https://") {
        builder.fetcher(HttpFetcher::new())
    } else {
        match &args.root {
            Some(root) => builder.fetcher(FileFetcher::with_root(root)),
            None => builder.fetcher(FileFetcher::new()),
        }
    };

    builder = match args.format {
        TileFormat::Mvt => builder.decoder(MvtDecoder::new(tile_size)),
        TileFormat::Geojson => builder.decoder(GeoJsonDecoder),
    };

    if let Some(subdomains) = &args.subdomains {
        builder = builder.subdomains(subdomains.clone());
    }

    Ok(builder.build()?)
}

async fn report_events(mut events: EventReceiver) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Missed {} index events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            IndexEvent::TileError { key, url, cause } => {
                warn!("Tile {} ({}) failed: {}", key, url, cause);
            }
            IndexEvent::FeatureJoinError {
                identity,
                geometry_types: (existing, added),
            } => {
                warn!(
                    "Could not join {} into {} for feature {}",
                    added, existing, identity
                );
            }
            IndexEvent::FeatureAdded { .. } | IndexEvent::IndexReset => {}
        }
    }
}
