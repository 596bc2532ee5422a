//! Periodic expiration sweep across both session tiers.
//!
//! Computes each realm's cutoff from its session policy, removes
//! expired durable records, then evicts the corresponding cache keys so
//! the two tiers cannot disagree for longer than one sweep interval.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::realm::RealmPolicySource;
use crate::scheduler::Scheduler;

use super::cache::SessionCache;
use super::store::OfflineSessionStore;

/// Name of the periodic sweep task.
pub const EXPIRATION_SWEEP_TASK_NAME: &str = "offline-session-expiration-sweep";

/// Default sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Reclaims expired sessions from the durable store and the cache.
pub struct ExpirationSweeper {
    clock: Arc<Clock>,
    cache: Arc<SessionCache>,
    store: Arc<OfflineSessionStore>,
    policies: Arc<dyn RealmPolicySource>,
    /// Whether the sweep also runs the cache's backstop TTL eviction.
    cache_backstop: bool,
}

impl ExpirationSweeper {
    pub fn new(
        clock: Arc<Clock>,
        cache: Arc<SessionCache>,
        store: Arc<OfflineSessionStore>,
        policies: Arc<dyn RealmPolicySource>,
        cache_backstop: bool,
    ) -> Self {
        Self {
            clock,
            cache,
            store,
            policies,
            cache_backstop,
        }
    }

    /// Sweep one realm on demand. Removes expired durable records
    /// (cascading to client rows) and evicts their cache keys.
    /// Returns the number of sessions removed.
    pub fn sweep_realm(&self, realm_id: &str) -> Result<usize> {
        let policy = self
            .policies
            .policy_for(realm_id)
            .with_context(|| format!("No session policy for realm: {}", realm_id))?;
        let now = self.clock.now();

        let removed = self.store.remove_expired(realm_id, &policy, now)?;
        for id in &removed {
            self.cache.remove(id);
        }

        if !removed.is_empty() {
            info!(realm = realm_id, removed = removed.len(), "Session sweep completed");
        } else {
            debug!(realm = realm_id, "Session sweep: no expired sessions");
        }
        Ok(removed.len())
    }

    /// Sweep every realm the policy source knows about. A realm that
    /// fails is logged and skipped; the rest of the batch proceeds.
    /// Returns the total number of sessions removed.
    pub fn sweep(&self) -> usize {
        let mut total = 0;
        for realm_id in self.policies.realm_ids() {
            match self.sweep_realm(&realm_id) {
                Ok(removed) => total += removed,
                Err(e) => {
                    warn!(realm = %realm_id, error = %e, "Session sweep failed for realm");
                }
            }
        }

        if self.cache_backstop {
            self.cache.evict_stale(self.policies.as_ref(), &self.clock);
        }
        total
    }

    /// Mount the periodic sweep task on the scheduler under
    /// [`EXPIRATION_SWEEP_TASK_NAME`].
    pub fn mount(self: &Arc<Self>, scheduler: &Scheduler, sweep_interval: Duration) {
        let sweeper = Arc::clone(self);
        scheduler.schedule(
            EXPIRATION_SWEEP_TASK_NAME,
            sweep_interval,
            Arc::new(move || {
                sweeper.sweep();
            }),
        );
    }
}
