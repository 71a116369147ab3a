//! Index configuration.
//!
//! Re-exports the mode enums from `tileprobe-types` for convenience.
use serde::de::Error;

pub use tileprobe_types::config::{FeatureMode, LoadingMode};

/// Index configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Layer names to index. Empty means every layer present in a tile.
    #[serde(default)]
    pub layers: Vec<String>,

    #[serde(default = "Config::default_tile_size")]
    pub tile_size: u32,

    /// Added to the display zoom to get the zoom used for tile math.
    #[serde(default)]
    pub zoom_offset: i8,

    #[serde(default)]
    pub min_zoom: u8,

    #[serde(default = "Config::default_max_zoom")]
    pub max_zoom: u8,

    /// Search extent, in display pixels, for queries that do not give one.
    #[serde(default = "Config::default_radius")]
    pub default_radius: f64,

    #[serde(default = "Config::default_max_results")]
    pub default_max_results: usize,

    #[serde(default)]
    pub feature_mode: FeatureMode,

    #[serde(default)]
    pub loading_mode: LoadingMode,

    /// Property read by the default identity extractor.
    #[serde(default = "Config::default_id_property")]
    pub id_property: String,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default = "Config::default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Largest number of tiles one query or viewport may cover. Larger
    /// requests are rejected before anything is fetched.
    #[serde(default = "Config::default_max_tiles_per_query")]
    pub max_tiles_per_query: usize,

    /// Buffer size of the event channel; slow subscribers lag past this.
    #[serde(default = "Config::default_event_capacity")]
    pub event_capacity: usize,
}

/// Tuning for query extent escalation.
///
/// A query with escalation enabled doubles its extent, starting from `start`
/// when the caller gives none, for as long as it finds nothing and the extent
/// is still below `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    #[serde(default = "EscalationConfig::default_start")]
    pub start: f64,

    #[serde(default = "EscalationConfig::default_ceiling")]
    pub ceiling: f64,
}

impl EscalationConfig {
    const fn default_start() -> f64 {
        3.0
    }

    const fn default_ceiling() -> f64 {
        100.0
    }

    pub fn new(start: f64, ceiling: f64) -> Self {
        Self { start, ceiling }
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            start: Self::default_start(),
            ceiling: Self::default_ceiling(),
        }
    }
}

impl Config {
    const fn default_tile_size() -> u32 {
        256
    }

    const fn default_max_zoom() -> u8 {
        22
    }

    const fn default_radius() -> f64 {
        20.0
    }

    const fn default_max_results() -> usize {
        5
    }

    fn default_id_property() -> String {
        "osm_id".to_string()
    }

    const fn default_max_concurrent_fetches() -> usize {
        8
    }

    const fn default_max_tiles_per_query() -> usize {
        1024
    }

    const fn default_event_capacity() -> usize {
        256
    }

    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        assert!(tile_size > 0, "Tile size must be greater than zero");
        self.tile_size = tile_size;
        self
    }

    pub fn with_zoom_offset(mut self, offset: i8) -> Self {
        self.zoom_offset = offset;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        assert!(min_zoom <= max_zoom, "min_zoom must not exceed max_zoom");
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_default_radius(mut self, radius: f64) -> Self {
        self.default_radius = radius;
        self
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        assert!(max_results > 0, "Max results must be greater than zero");
        self.default_max_results = max_results;
        self
    }

    pub fn with_feature_mode(mut self, mode: FeatureMode) -> Self {
        self.feature_mode = mode;
        self
    }

    pub fn with_loading_mode(mut self, mode: LoadingMode) -> Self {
        self.loading_mode = mode;
        self
    }

    pub fn with_id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = property.into();
        self
    }

    pub fn with_escalation(mut self, escalation: EscalationConfig) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        assert!(limit > 0, "Fetch concurrency must be greater than zero");

        if limit > 64 {
            log::warn!(
                "Fetch concurrency of {} is very high; most tile servers throttle far below this",
                limit
            );
        }

        self.max_concurrent_fetches = limit;
        self
    }

    pub fn with_max_tiles_per_query(mut self, limit: usize) -> Self {
        assert!(limit > 0, "Tile limit must be greater than zero");
        self.max_tiles_per_query = limit;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Event capacity must be greater than zero");
        self.event_capacity = capacity;
        self
    }

    /// Effective zoom for a display zoom: offset applied, then clamped.
    pub fn effective_zoom(&self, display_zoom: u8) -> u8 {
        let raw = display_zoom as i16 + self.zoom_offset as i16;
        raw.clamp(self.min_zoom as i16, self.max_zoom as i16) as u8
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("Tile size must be greater than zero".to_string());
        }

        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }

        if !self.default_radius.is_finite() || self.default_radius <= 0.0 {
            return Err(format!(
                "Default radius must be positive and finite, got: {}",
                self.default_radius
            ));
        }

        if self.default_max_results == 0 {
            return Err("Default max results must be greater than zero".to_string());
        }

        if self.max_concurrent_fetches == 0 {
            return Err("Fetch concurrency must be greater than zero".to_string());
        }

        if self.max_tiles_per_query == 0 {
            return Err("Tile limit per query must be greater than zero".to_string());
        }

        if self.event_capacity == 0 {
            return Err("Event capacity must be greater than zero".to_string());
        }

        let EscalationConfig { start, ceiling } = self.escalation;
        if !start.is_finite() || start <= 0.0 {
            return Err(format!(
                "Escalation start must be positive and finite, got: {}",
                start
            ));
        }
        if !ceiling.is_finite() || ceiling < start {
            return Err(format!(
                "Escalation ceiling ({}) must be finite and at least the start ({})",
                ceiling, start
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            tile_size: Self::default_tile_size(),
            zoom_offset: 0,
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            default_radius: Self::default_radius(),
            default_max_results: Self::default_max_results(),
            feature_mode: FeatureMode::default(),
            loading_mode: LoadingMode::default(),
            id_property: Self::default_id_property(),
            escalation: EscalationConfig::default(),
            max_concurrent_fetches: Self::default_max_concurrent_fetches(),
            max_tiles_per_query: Self::default_max_tiles_per_query(),
            event_capacity: Self::default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.default_max_results, 5);
        assert_eq!(config.max_tiles_per_query, 1024);
        assert_eq!(config.escalation, EscalationConfig::new(3.0, 100.0));
    }

    #[test]
    fn test_from_json_partial() {
        let config = Config::from_json(
            r#"{"layers": ["landuse"], "feature_mode": "join", "escalation": {"ceiling": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.layers, vec!["landuse".to_string()]);
        assert_eq!(config.feature_mode, FeatureMode::Join);
        assert_eq!(config.loading_mode, LoadingMode::Lazy);
        assert_eq!(config.escalation.start, 3.0);
        assert_eq!(config.escalation.ceiling, 50.0);
    }

    #[test]
    fn test_from_json_rejects_unknown_and_invalid() {
        assert!(Config::from_json(r#"{"tile_sise": 512}"#).is_err());
        assert!(Config::from_json(r#"{"min_zoom": 10, "max_zoom": 4}"#).is_err());
        assert!(Config::from_json(r#"{"escalation": {"start": 8, "ceiling": 4}}"#).is_err());
        assert!(Config::from_json(r#"{"max_tiles_per_query": 0}"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Config::default()
            .with_layers(["poi_label"])
            .with_zoom_offset(-2)
            .with_loading_mode(LoadingMode::Eager);
        let json = config.to_json().unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed.layers, config.layers);
        assert_eq!(parsed.zoom_offset, -2);
        assert_eq!(parsed.loading_mode, LoadingMode::Eager);
    }

    #[test]
    fn test_effective_zoom_offset_and_clamp() {
        let config = Config::default().with_zoom_offset(2).with_zoom_range(0, 14);
        assert_eq!(config.effective_zoom(10), 12);
        assert_eq!(config.effective_zoom(13), 14);

        let config = Config::default().with_zoom_offset(-3).with_zoom_range(2, 22);
        assert_eq!(config.effective_zoom(4), 2);
    }

    #[test]
    #[should_panic(expected = "Max results must be greater than zero")]
    fn test_zero_max_results_panics() {
        let _ = Config::default().with_default_max_results(0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default().with_layers(["poi_label"]);
        let toml_str = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.layers, config.layers);
    }
}
