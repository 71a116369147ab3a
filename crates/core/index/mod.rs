//! The tile-driven spatial index.
//!
//! [`TileIndex`] ties the pieces together: tile math picks the tiles a query
//! needs, the loader makes them resident, decoded features flow into the
//! feature store, and the search step ranks what the R*-tree returns.
//!
//! # Concurrency
//!
//! `TileIndex` is a cheap `Clone` handle. The store sits behind one
//! `RwLock`: tile ingestion, resets and zoom changes take the write lock,
//! searches take the read lock. A query searches only after every tile it
//! asked for has settled, and a tile settles only after its features were
//! ingested.

mod events;
mod loader;
mod query;
mod store;

pub use events::{EventReceiver, IndexEvent};
pub use loader::{BatchSummary, TileCounts};
pub use query::{QueryHit, QueryOptions};

pub(crate) use loader::TileLoader;

use crate::builder::TileIndexBuilder;
use crate::compute::projection::Projection;
use crate::compute::tiles::{bbox_range, tile_range};
use crate::compute::validation::{
    validate_extent, validate_geographic_point, validate_max_results, validate_tile_count,
    validate_viewport,
};
use crate::config::{Config, LoadingMode};
use crate::error::{Result, TileProbeError};
use crate::source::DecodedLayer;
use events::EventChannel;
use geo::{Geometry, Point};
use loader::TileSink;
use parking_lot::RwLock;
use query::{QueryPhase, SearchRequest};
use std::sync::Arc;
use store::{FeatureStore, IngestOutcome};
use tileprobe_types::bbox::BoundingBox2D;
use tileprobe_types::feature::{Feature, FeatureId};
use tileprobe_types::tile::{TileKey, TileState};

/// Maps a decoded feature to its stable identity.
pub type IdentityFn = Arc<dyn Fn(&Feature) -> Option<FeatureId> + Send + Sync>;

/// Decides whether a decoded feature is indexed at all.
pub type FeatureFilter = Arc<dyn Fn(&Feature) -> bool + Send + Sync>;

/// Identity extractor reading `property` from the feature's properties.
pub fn property_identity(property: impl Into<String>) -> IdentityFn {
    let property = property.into();
    Arc::new(move |feature: &Feature| feature.property(&property).and_then(FeatureId::from_json))
}

/// Snapshot of the index's size and tile bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub display_zoom: u8,
    pub effective_zoom: u8,
    pub tiles: TileCounts,
    /// Records in the R*-tree.
    pub features: usize,
    /// Records with an identity.
    pub identities: usize,
    /// Tile fetches issued since the index was built.
    pub fetches: u64,
    /// Number of resets so far.
    pub epoch: u64,
}

struct IndexState {
    store: FeatureStore,
    display_zoom: u8,
    zoom: u8,
}

struct Inner {
    config: Config,
    projection: Arc<dyn Projection>,
    loader: Arc<TileLoader>,
    state: RwLock<IndexState>,
    identity: IdentityFn,
    filter: Option<FeatureFilter>,
    events: EventChannel,
}

/// On-demand spatial index over a tile pyramid.
#[derive(Clone)]
pub struct TileIndex {
    inner: Arc<Inner>,
}

impl TileIndex {
    pub fn builder() -> TileIndexBuilder {
        TileIndexBuilder::new()
    }

    pub(crate) fn from_parts(
        config: Config,
        projection: Arc<dyn Projection>,
        loader: TileLoader,
        identity: IdentityFn,
        filter: Option<FeatureFilter>,
        display_zoom: u8,
    ) -> Self {
        let zoom = config.effective_zoom(display_zoom);
        let events = EventChannel::new(config.event_capacity);
        let store = FeatureStore::new(config.feature_mode);

        log::debug!(
            "Index ready: display zoom {}, effective zoom {}, {:?} mode, {:?} loading",
            display_zoom,
            zoom,
            config.feature_mode,
            config.loading_mode
        );

        Self {
            inner: Arc::new(Inner {
                config,
                projection,
                loader: Arc::new(loader),
                state: RwLock::new(IndexState {
                    store,
                    display_zoom,
                    zoom,
                }),
                identity,
                filter,
                events,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Features near `location` (lon/lat), nearest first.
    ///
    /// `extent` is the search half-width in display pixels; the configured
    /// default radius is used when it is `None` (or the escalation start,
    /// when escalating). Only invalid parameters are errors: tiles that fail
    /// to load are reported as events and the query answers from whatever
    /// did load. A request covering more than `max_tiles_per_query` tiles
    /// is rejected before anything is fetched; an escalating query stops
    /// growing instead.
    pub async fn query(
        &self,
        location: Point,
        extent: Option<f64>,
        options: QueryOptions,
    ) -> Result<Vec<QueryHit>> {
        validate_geographic_point(&location)?;
        if let Some(extent) = extent {
            validate_extent(extent)?;
        }
        let max_results = options
            .max_results
            .unwrap_or(self.inner.config.default_max_results);
        validate_max_results(max_results)?;

        let escalation = self.inner.config.escalation;
        let mut extent = match extent {
            Some(extent) => extent,
            None if options.escalate => escalation.start,
            None => self.inner.config.default_radius,
        };
        let mut phase = QueryPhase::Idle;

        loop {
            let (zoom, scale) = self.frame();
            let pixel = self.inner.projection.project(&location, zoom);
            let pixel_extent = extent * scale;

            let range = tile_range(&pixel, pixel_extent, self.inner.config.tile_size, zoom)?;
            if let Err(e) = validate_tile_count(&range, self.inner.config.max_tiles_per_query) {
                if phase != QueryPhase::Escalating {
                    return Err(e);
                }
                // Every smaller extent already came up empty.
                log::debug!("Escalation stopped at extent {}: {}", extent, e);
                phase.advance(QueryPhase::Done);
                return Ok(Vec::new());
            }
            phase.advance(QueryPhase::TilesPending);
            let batch = self
                .inner
                .loader
                .ensure_loaded(range.keys().collect(), &pixel, self.sink())
                .await;
            if batch.failed > 0 {
                log::debug!("{} of {} tiles failed, searching partial data", batch.failed, batch.tiles);
            }

            phase.advance(QueryPhase::Searching);
            let hits = {
                let state = self.inner.state.read();
                query::search(
                    &state.store,
                    &SearchRequest {
                        location: &location,
                        pixel,
                        extent: pixel_extent,
                        only_inside: options.only_inside,
                        max_results,
                    },
                )
            };

            if hits.is_empty() && options.escalate && extent < escalation.ceiling {
                extent = if extent > 0.0 {
                    extent * 2.0
                } else {
                    escalation.start
                };
                phase.advance(QueryPhase::Escalating);
                log::debug!("Nothing found, escalating extent to {}", extent);
                continue;
            }

            phase.advance(QueryPhase::Done);
            return Ok(hits);
        }
    }

    /// Load every tile intersecting a lon/lat viewport. Does nothing in lazy
    /// loading mode. Fails, without fetching, when the viewport covers more
    /// than `max_tiles_per_query` tiles.
    pub async fn update_viewport(&self, bounds: BoundingBox2D) -> Result<BatchSummary> {
        validate_viewport(&bounds)?;
        if self.inner.config.loading_mode == LoadingMode::Lazy {
            return Ok(BatchSummary::default());
        }

        let (zoom, _) = self.frame();
        let pixels = self.inner.projection.project_bbox(&bounds, zoom);
        let range = bbox_range(&pixels, self.inner.config.tile_size, zoom);
        validate_tile_count(&range, self.inner.config.max_tiles_per_query)?;
        let summary = self
            .inner
            .loader
            .ensure_loaded(range.keys().collect(), &pixels.center(), self.sink())
            .await;
        log::debug!("Viewport batch settled: {:?}", summary);
        Ok(summary)
    }

    /// Set the display zoom. A change of effective zoom resets the index,
    /// since every cached box is in the old zoom's pixels. Returns whether a
    /// reset happened.
    pub fn set_zoom(&self, display_zoom: u8) -> bool {
        let zoom = self.inner.config.effective_zoom(display_zoom);
        {
            let mut state = self.inner.state.write();
            state.display_zoom = display_zoom;
            if state.zoom == zoom {
                return false;
            }
            log::debug!("Effective zoom {} -> {}", state.zoom, zoom);
            state.zoom = zoom;
            self.inner.clear(&mut state);
        }
        self.inner.events.emit(IndexEvent::IndexReset);
        true
    }

    /// Drop every tile, record and identity. The next query refetches
    /// everything it needs.
    pub fn reset(&self) {
        {
            let mut state = self.inner.state.write();
            self.inner.clear(&mut state);
        }
        self.inner.events.emit(IndexEvent::IndexReset);
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    pub fn tile_state(&self, key: &TileKey) -> Option<TileState> {
        self.inner.loader.state(key)
    }

    pub fn display_zoom(&self) -> u8 {
        self.inner.state.read().display_zoom
    }

    pub fn effective_zoom(&self) -> u8 {
        self.inner.state.read().zoom
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.inner.state.read();
        IndexStats {
            display_zoom: state.display_zoom,
            effective_zoom: state.zoom,
            tiles: self.inner.loader.counts(),
            features: state.store.len(),
            identities: state.store.identities(),
            fetches: self.inner.loader.fetch_count(),
            epoch: self.inner.loader.epoch(),
        }
    }

    /// Effective zoom and the display-to-effective pixel scale.
    fn frame(&self) -> (u8, f64) {
        let state = self.inner.state.read();
        let scale = 2f64.powi(state.zoom as i32 - state.display_zoom as i32);
        (state.zoom, scale)
    }

    fn sink(&self) -> Arc<dyn TileSink> {
        Arc::clone(&self.inner) as Arc<dyn TileSink>
    }
}

impl std::fmt::Debug for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileIndex")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn clear(&self, state: &mut IndexState) {
        self.loader.reset();
        state.store.clear();
        log::debug!("Index reset, epoch {}", self.loader.epoch());
    }

    fn pixel_bbox(&self, geometry: &Geometry, zoom: u8) -> Option<BoundingBox2D> {
        BoundingBox2D::of_geometry(geometry).map(|bbox| self.projection.project_bbox(&bbox, zoom))
    }

    fn record(&self, id: Option<FeatureId>, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Inserted(feature) | IngestOutcome::Merged(feature) => {
                self.events.emit(IndexEvent::FeatureAdded { id, feature });
            }
            IngestOutcome::Dropped => {}
            IngestOutcome::Rejected(TileProbeError::GeometryJoinFailure {
                identity,
                existing,
                added,
            }) => {
                log::warn!(
                    "Invalid join of geometry types {} and {} for feature {}",
                    added,
                    existing,
                    identity
                );
                self.events.emit(IndexEvent::FeatureJoinError {
                    identity,
                    geometry_types: (existing, added),
                });
            }
            IngestOutcome::Rejected(other) => log::warn!("Feature rejected: {}", other),
        }
    }
}

impl TileSink for Inner {
    fn accept(&self, key: TileKey, epoch: u64, layers: Vec<DecodedLayer>) {
        let mut state = self.state.write();
        if epoch != self.loader.epoch() || key.z != state.zoom {
            log::debug!("Discarding tile {} loaded before a reset", key);
            return;
        }

        let zoom = state.zoom;
        let mut ingested = 0usize;
        for layer in layers {
            for feature in layer.features {
                if let Some(filter) = &self.filter
                    && !filter(&feature)
                {
                    continue;
                }
                let id = (self.identity)(&feature);
                let outcome = state
                    .store
                    .ingest(id.clone(), feature, |geometry| self.pixel_bbox(geometry, zoom));
                self.record(id, outcome);
                ingested += 1;
            }
        }
        log::debug!("Tile {} loaded with {} features", key, ingested);
    }

    fn tile_failed(&self, key: TileKey, epoch: u64, url: &str, error: &TileProbeError) {
        if epoch != self.loader.epoch() {
            return;
        }
        let cause = match error {
            TileProbeError::FetchFailure { cause, .. } | TileProbeError::DecodeFailure { cause, .. } => {
                cause.clone()
            }
            other => other.to_string(),
        };
        self.events.emit(IndexEvent::TileError {
            key,
            url: url.to_string(),
            cause,
        });
    }
}
