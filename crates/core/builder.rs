//! Index builder
//!
//! Wires the collaborators (fetcher, decoder, projection, URL template) and
//! the per-deployment hooks (identity, filter) into a [`TileIndex`].

use crate::compute::projection::{Projection, WebMercator};
use crate::config::Config;
use crate::error::{Result, TileProbeError};
use crate::index::{FeatureFilter, IdentityFn, TileIndex, TileLoader, property_identity};
use crate::source::{TileDecoder, TileFetcher, TileUrlTemplate};
use std::sync::Arc;
use tileprobe_types::feature::{Feature, FeatureId};

/// Builder for [`TileIndex`].
///
/// A fetcher and a URL template are required. Without an explicit decoder the
/// index decodes Mapbox Vector Tiles (with the `mvt` feature); without an
/// explicit projection it uses [`WebMercator`] at the configured tile size.
pub struct TileIndexBuilder {
    config: Config,
    template: Option<String>,
    subdomains: Option<Vec<String>>,
    fetcher: Option<Arc<dyn TileFetcher>>,
    decoder: Option<Arc<dyn TileDecoder>>,
    projection: Option<Arc<dyn Projection>>,
    identity: Option<IdentityFn>,
    filter: Option<FeatureFilter>,
    zoom: u8,
}

impl TileIndexBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            template: None,
            subdomains: None,
            fetcher: None,
            decoder: None,
            projection: None,
            identity: None,
            filter: None,
            zoom: 0,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Tile URL template, e.g. `https://{s}.example.com/{z}/{x}/{y}.pbf`.
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Subdomains substituted for `{s}`; `a`, `b`, `c` by default.
    pub fn subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = Some(subdomains.into_iter().map(Into::into).collect());
        self
    }

    pub fn fetcher<F: TileFetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn decoder<D: TileDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn projection<P: Projection + 'static>(mut self, projection: P) -> Self {
        self.projection = Some(Arc::new(projection));
        self
    }

    /// Identity extractor. Defaults to reading the configured `id_property`.
    pub fn identity<F>(mut self, identity: F) -> Self
    where
        F: Fn(&Feature) -> Option<FeatureId> + Send + Sync + 'static,
    {
        self.identity = Some(Arc::new(identity));
        self
    }

    /// Only features passing `filter` are indexed.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Feature) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Initial display zoom.
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn build(self) -> Result<TileIndex> {
        self.config.validate().map_err(TileProbeError::InvalidConfig)?;

        let fetcher = self
            .fetcher
            .ok_or_else(|| TileProbeError::InvalidConfig("no tile fetcher configured".to_string()))?;
        let template = self
            .template
            .ok_or_else(|| TileProbeError::InvalidConfig("no tile URL template configured".to_string()))?;
        let template = match self.subdomains {
            Some(subdomains) => TileUrlTemplate::new(template).with_subdomains(subdomains),
            None => TileUrlTemplate::new(template),
        };

        let tile_size = self.config.tile_size;
        let projection = self
            .projection
            .unwrap_or_else(|| Arc::new(WebMercator::new(tile_size)) as Arc<dyn Projection>);
        let decoder = match self.decoder {
            Some(decoder) => decoder,
            None => default_decoder(tile_size, &projection)?,
        };
        let identity = self
            .identity
            .unwrap_or_else(|| property_identity(self.config.id_property.clone()));

        let loader = TileLoader::new(
            fetcher,
            decoder,
            template,
            self.config.layers.clone(),
            tile_size,
            self.config.max_concurrent_fetches,
        );

        Ok(TileIndex::from_parts(
            self.config,
            projection,
            loader,
            identity,
            self.filter,
            self.zoom,
        ))
    }
}

#[cfg(feature = "mvt")]
fn default_decoder(tile_size: u32, projection: &Arc<dyn Projection>) -> Result<Arc<dyn TileDecoder>> {
    Ok(Arc::new(
        crate::source::MvtDecoder::new(tile_size).with_projection(Arc::clone(projection)),
    ))
}

#[cfg(not(feature = "mvt"))]
fn default_decoder(_tile_size: u32, _projection: &Arc<dyn Projection>) -> Result<Arc<dyn TileDecoder>> {
    Err(TileProbeError::InvalidConfig(
        "no tile decoder configured and the `mvt` feature is disabled".to_string(),
    ))
}

impl Default for TileIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TileIndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileIndexBuilder")
            .field("config", &self.config)
            .field("template", &self.template)
            .field("zoom", &self.zoom)
            .finish_non_exhaustive()
    }
}
