use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Find features near a location in a vector tile source", long_about = None)]
pub struct Args {
    /// Tile URL or path template with {z}, {x}, {y} and optional {s}.
    #[arg(short, long)]
    pub tiles: String,

    /// Directory relative tile paths are resolved against.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Tile payload format.
    #[arg(long, value_enum, default_value_t = TileFormat::Mvt)]
    pub format: TileFormat,

    /// Layer to index; repeat for several. All layers when omitted.
    #[arg(short, long = "layer")]
    pub layers: Vec<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Display zoom.
    #[arg(short, long, default_value_t = 14)]
    pub zoom: u8,

    /// Search half-width in display pixels.
    #[arg(short, long)]
    pub radius: Option<f64>,

    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Keep only polygons strictly containing the location.
    #[arg(long)]
    pub only_inside: bool,

    /// Grow the radius until something is found.
    #[arg(long)]
    pub escalate: bool,

    /// Merge polygon fragments that share an identity.
    #[arg(long)]
    pub join: bool,

    /// Subdomains for {s}, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub subdomains: Option<Vec<String>>,

    /// Configuration file (TOML, or JSON with a .json extension).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TileFormat {
    /// Mapbox Vector Tiles, optionally gzipped.
    Mvt,
    /// JSON object of layer name to GeoJSON.
    Geojson,
}
