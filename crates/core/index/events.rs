//! Events reported by the index to its observers.
//!
//! Tile and join failures never reach query callers as errors; observers
//! that care subscribe here. Delivery is best effort: a subscriber that falls
//! more than `event_capacity` events behind sees a lag and skips ahead.

use std::sync::Arc;
use tileprobe_types::feature::{Feature, FeatureId};
use tileprobe_types::tile::TileKey;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// A tile failed to fetch or decode and is `Failed` for this session.
    TileError {
        key: TileKey,
        url: String,
        cause: String,
    },
    /// A fragment could not be joined into the feature sharing its identity.
    /// `geometry_types` is `(existing, added)`.
    FeatureJoinError {
        identity: FeatureId,
        geometry_types: (&'static str, &'static str),
    },
    /// A record was inserted or its geometry was merged.
    FeatureAdded {
        id: Option<FeatureId>,
        feature: Arc<Feature>,
    },
    /// Every tile, record and identity was dropped.
    IndexReset,
}

pub type EventReceiver = broadcast::Receiver<IndexEvent>;

pub(crate) struct EventChannel {
    sender: broadcast::Sender<IndexEvent>,
}

impl EventChannel {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: IndexEvent) {
        // No subscribers is the common case.
        let _ = self.sender.send(event);
    }
}
