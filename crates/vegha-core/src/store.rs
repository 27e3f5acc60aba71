// ── Metrics store ──
//
// Single-owner holder of the current MetricsSnapshot. Every write replaces
// the whole `Arc`, so readers never observe a mix of old and new fields.
// Changes are pushed to subscribers through `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::MetricsSnapshot;
use crate::stream::SnapshotStream;

pub struct MetricsStore {
    snapshot: watch::Sender<Arc<MetricsSnapshot>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
    defaults: MetricsSnapshot,
}

impl MetricsStore {
    /// Create a store holding `defaults`.
    pub fn new(defaults: MetricsSnapshot) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(defaults));
        let (last_update, _) = watch::channel(None);

        Self {
            snapshot,
            last_update,
            defaults,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<MetricsSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    /// When the current snapshot arrived, or `None` if it is the default.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    /// How long ago the last update was applied.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_update().map(|t| Utc::now() - t)
    }

    /// `true` when no live data is held.
    pub fn is_default(&self) -> bool {
        self.last_update().is_none()
    }

    // ── Writes (ConnectionManager only) ──────────────────────────────

    /// Atomically replace the snapshot.
    ///
    /// The timestamp is written first: a reader woken by the snapshot
    /// channel must already see it as live.
    pub(crate) fn replace(&self, snapshot: MetricsSnapshot) {
        self.last_update.send_replace(Some(Utc::now()));
        self.snapshot.send_replace(Arc::new(snapshot));
    }

    /// Discard live data. Returns `false` if the store already held defaults.
    pub(crate) fn reset(&self) -> bool {
        if self.is_default() {
            return false;
        }
        self.last_update.send_replace(None);
        self.snapshot.send_replace(Arc::new(self.defaults));
        true
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(MetricsSnapshot::default())
    }
}
