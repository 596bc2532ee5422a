//! Debounced propagation of last-refresh timestamps to the durable store.
//!
//! Token use refreshes a session's cache entry synchronously, but the
//! durable timestamp is only eventually consistent: refreshes are
//! buffered here and flushed at a bounded cadence, avoiding one durable
//! write per token use. Because the durable update is monotonic and
//! idempotent, redundant or reordered flushes never corrupt state.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::scheduler::Scheduler;

use super::store::OfflineSessionStore;
use super::types::SessionId;

/// Name of the periodic flush task; tests cancel/resume it by name.
pub const REFRESH_FLUSH_TASK_NAME: &str = "offline-session-refresh-flush";

/// Default flush cadence in seconds.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;

/// Default buffer size bound that triggers an early flush.
pub const DEFAULT_MAX_PENDING_REFRESHES: usize = 1000;

/// Durable target of a flushed refresh. Returns whether the session was
/// found; an error leaves the entry buffered for the next cycle.
pub trait RefreshSink: Send + Sync {
    fn apply_refresh(&self, realm_id: &str, id: SessionId, timestamp: DateTime<Utc>)
        -> Result<bool>;
}

impl RefreshSink for OfflineSessionStore {
    fn apply_refresh(
        &self,
        realm_id: &str,
        id: SessionId,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        self.update_last_refresh(realm_id, id, timestamp)
    }
}

/// Buffers the most recent pending refresh timestamp per session until
/// the next flush.
pub struct RefreshDebouncer {
    sink: Arc<dyn RefreshSink>,
    pending: Mutex<HashMap<(String, SessionId), DateTime<Utc>>>,
    max_pending: usize,
}

impl RefreshDebouncer {
    pub fn new(store: Arc<OfflineSessionStore>, max_pending: usize) -> Self {
        Self::with_sink(store as Arc<dyn RefreshSink>, max_pending)
    }

    pub fn with_sink(sink: Arc<dyn RefreshSink>, max_pending: usize) -> Self {
        Self {
            sink,
            pending: Mutex::new(HashMap::new()),
            max_pending,
        }
    }

    /// Record a pending refresh. Timestamps for the same session merge
    /// by maximum. Exceeding the size bound triggers an immediate flush
    /// rather than waiting for the next scheduled cycle.
    pub fn enqueue(&self, realm_id: &str, id: SessionId, timestamp: DateTime<Utc>) {
        let over_bound = {
            let mut pending = match self.pending.lock() {
                Ok(pending) => pending,
                Err(_) => return,
            };
            let entry = pending
                .entry((realm_id.to_string(), id))
                .or_insert(timestamp);
            if timestamp > *entry {
                *entry = timestamp;
            }
            pending.len() > self.max_pending
        };

        if over_bound {
            debug!(bound = self.max_pending, "Pending refresh buffer over bound, flushing early");
            self.flush();
        }
    }

    /// Number of buffered, not-yet-flushed refreshes.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Drain the buffer and issue one durable update per entry.
    /// Failed entries stay buffered and are retried next cycle; a
    /// session already swept from the store is simply dropped.
    /// Returns the number of entries flushed.
    pub fn flush(&self) -> usize {
        let drained: HashMap<(String, SessionId), DateTime<Utc>> = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return 0,
        };
        if drained.is_empty() {
            return 0;
        }

        let mut flushed = 0;
        for ((realm_id, id), timestamp) in drained {
            match self.sink.apply_refresh(&realm_id, id, timestamp) {
                Ok(_) => flushed += 1,
                Err(e) => {
                    warn!(
                        session = %id,
                        error = %e,
                        "Failed to flush session refresh, will retry"
                    );
                    // Re-merge so a concurrent enqueue's newer timestamp wins
                    if let Ok(mut pending) = self.pending.lock() {
                        let entry = pending.entry((realm_id, id)).or_insert(timestamp);
                        if timestamp > *entry {
                            *entry = timestamp;
                        }
                    }
                }
            }
        }

        if flushed > 0 {
            debug!(flushed, "Flushed pending session refreshes");
        }
        flushed
    }

    /// Mount the periodic flush task on the scheduler under
    /// [`REFRESH_FLUSH_TASK_NAME`]. Cancelling the task never drops
    /// buffered entries; they flush on the next successful cycle.
    pub fn mount(self: &Arc<Self>, scheduler: &Scheduler, flush_interval: Duration) {
        let debouncer = Arc::clone(self);
        scheduler.schedule(
            REFRESH_FLUSH_TASK_NAME,
            flush_interval,
            Arc::new(move || {
                debouncer.flush();
            }),
        );
    }
}
