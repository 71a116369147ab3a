//! Tile acquisition.
//!
//! Every tile key gets one `watch` channel for the lifetime of a session. The
//! first request for a key creates it in `Pending` and schedules the load;
//! later requests subscribe to the same channel, so a tile is fetched at most
//! once per session no matter how many queries want it.
//!
//! A batch is driven by one spawned task that acquires fetch permits in
//! priority order and spawns the fetch itself, so a query that is dropped
//! mid-batch does not cancel anything it started.

use crate::compute::tiles::prioritize;
use crate::error::TileProbeError;
use crate::source::{DecodedLayer, TileDecoder, TileFetcher, TileUrlTemplate};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use geo::Point;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tileprobe_types::tile::{TileKey, TileState};
use tokio::sync::{Semaphore, watch};

/// Receives the outcome of every tile load.
///
/// `epoch` is the loader epoch the load started in; the sink must discard
/// results from an epoch that has since been reset.
pub(crate) trait TileSink: Send + Sync + 'static {
    fn accept(&self, key: TileKey, epoch: u64, layers: Vec<DecodedLayer>);

    fn tile_failed(&self, key: TileKey, epoch: u64, url: &str, error: &TileProbeError);
}

/// Outcome of one [`TileLoader::ensure_loaded`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Tiles the batch covered.
    pub tiles: usize,
    /// Tiles this batch started loading; the rest were already known.
    pub scheduled: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Counts of tiles per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCounts {
    pub pending: usize,
    pub loaded: usize,
    pub failed: usize,
}

pub(crate) struct TileLoader {
    tiles: DashMap<TileKey, Arc<watch::Sender<TileState>>>,
    fetcher: Arc<dyn TileFetcher>,
    decoder: Arc<dyn TileDecoder>,
    template: TileUrlTemplate,
    layers: Arc<[String]>,
    permits: Arc<Semaphore>,
    tile_size: u32,
    epoch: AtomicU64,
    fetches: AtomicU64,
}

impl TileLoader {
    pub(crate) fn new(
        fetcher: Arc<dyn TileFetcher>,
        decoder: Arc<dyn TileDecoder>,
        template: TileUrlTemplate,
        layers: Vec<String>,
        tile_size: u32,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            tiles: DashMap::new(),
            fetcher,
            decoder,
            template,
            layers: layers.into(),
            permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
            tile_size,
            epoch: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Make every key in `keys` settle (`Loaded` or `Failed`), loading the
    /// ones nobody has requested yet, closest to `center` first.
    ///
    /// Resolves only once each key has settled, including keys whose load
    /// was started by another caller.
    pub(crate) async fn ensure_loaded(
        self: &Arc<Self>,
        mut keys: Vec<TileKey>,
        center: &Point,
        sink: Arc<dyn TileSink>,
    ) -> BatchSummary {
        prioritize(&mut keys, center, self.tile_size);

        let epoch = self.epoch();
        let mut receivers = Vec::with_capacity(keys.len());
        let mut scheduled = Vec::new();

        for key in &keys {
            match self.tiles.entry(*key) {
                Entry::Occupied(entry) => receivers.push(entry.get().subscribe()),
                Entry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(TileState::Pending);
                    let tx = Arc::new(tx);
                    entry.insert(Arc::clone(&tx));
                    scheduled.push((*key, tx));
                    receivers.push(rx);
                }
            }
        }

        let summary = BatchSummary {
            tiles: keys.len(),
            scheduled: scheduled.len(),
            ..Default::default()
        };

        if !scheduled.is_empty() {
            log::debug!("Scheduling {} of {} tiles", scheduled.len(), keys.len());
            self.spawn_batch(scheduled, epoch, sink);
        }

        let states = join_all(receivers.into_iter().map(|mut rx| async move {
            match rx.wait_for(TileState::is_settled).await {
                Ok(state) => *state,
                // The load task went away without reporting.
                Err(_) => TileState::Failed,
            }
        }))
        .await;

        states.into_iter().fold(summary, |mut summary, state| {
            match state {
                TileState::Loaded => summary.loaded += 1,
                TileState::Failed => summary.failed += 1,
                TileState::Pending => {}
            }
            summary
        })
    }

    fn spawn_batch(
        self: &Arc<Self>,
        scheduled: Vec<(TileKey, Arc<watch::Sender<TileState>>)>,
        epoch: u64,
        sink: Arc<dyn TileSink>,
    ) {
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            for (key, tx) in scheduled {
                let Ok(permit) = Arc::clone(&loader.permits).acquire_owned().await else {
                    tx.send_replace(TileState::Failed);
                    continue;
                };
                let loader = Arc::clone(&loader);
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let state = loader.load(key, epoch, sink.as_ref()).await;
                    drop(permit);
                    tx.send_replace(state);
                });
            }
        });
    }

    async fn load(&self, key: TileKey, epoch: u64, sink: &dyn TileSink) -> TileState {
        let url = self.template.url(&key);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        log::debug!("Fetching tile {} from {}", key, url);

        let decoded = match self.fetcher.fetch(&url).await {
            Ok(bytes) => self.decoder.decode(key, &bytes, &self.layers),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(layers) => {
                sink.accept(key, epoch, layers);
                TileState::Loaded
            }
            Err(e) => {
                log::warn!("Tile {} failed: {}", key, e);
                sink.tile_failed(key, epoch, &url, &e);
                TileState::Failed
            }
        }
    }

    pub(crate) fn state(&self, key: &TileKey) -> Option<TileState> {
        self.tiles.get(key).map(|tx| *tx.borrow())
    }

    pub(crate) fn counts(&self) -> TileCounts {
        self.tiles
            .iter()
            .fold(TileCounts::default(), |mut counts, entry| {
                match *entry.value().borrow() {
                    TileState::Pending => counts.pending += 1,
                    TileState::Loaded => counts.loaded += 1,
                    TileState::Failed => counts.failed += 1,
                }
                counts
            })
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Forget every tile. Loads already in flight finish against their old
    /// channel and are discarded by the sink.
    pub(crate) fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.tiles.clear();
    }
}
