//! Kestrel session-state layer.
//!
//! Tracks authenticated user sessions and their per-client sub-sessions
//! across the cluster, and supports long-lived offline sessions that
//! survive logout and node restarts so previously issued grants remain
//! verifiable until they truly expire.
//!
//! The layer has two tiers: a volatile cache for active (online)
//! sessions, and a durable redb-backed store for sessions explicitly
//! promoted to offline. Refresh timestamps propagate to the durable
//! store through a debounced background flush, and an expiration
//! sweeper reclaims expired records from both tiers.

pub mod clientpolicy;
pub mod clock;
pub mod config;
pub mod realm;
pub mod scheduler;
pub mod session;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub use clock::Clock;
pub use config::SessionLayerConfig;
pub use realm::{RealmPolicySource, RealmSessionPolicy};
pub use scheduler::Scheduler;
pub use session::{
    AuthenticatedClientSession, ExpirationSweeper, OfflineSessionStore, RefreshDebouncer,
    SessionCache, SessionId, SessionManager, UserSession,
};

/// Fully wired session layer: both tiers, the debouncer, the sweeper,
/// and the facade, sharing one clock.
pub struct SessionLayer {
    pub clock: Arc<Clock>,
    pub cache: Arc<SessionCache>,
    pub store: Arc<OfflineSessionStore>,
    pub debouncer: Arc<RefreshDebouncer>,
    pub sweeper: Arc<ExpirationSweeper>,
    pub manager: Arc<SessionManager>,
    config: SessionLayerConfig,
}

impl SessionLayer {
    /// Open the durable store and wire up all components.
    pub fn open(
        config: SessionLayerConfig,
        policies: Arc<dyn RealmPolicySource>,
    ) -> Result<Self> {
        let clock = Arc::new(Clock::new());
        Self::open_with_clock(config, policies, clock)
    }

    /// Like [`Self::open`], with a caller-supplied clock. Tests pass a
    /// clock they control.
    pub fn open_with_clock(
        config: SessionLayerConfig,
        policies: Arc<dyn RealmPolicySource>,
        clock: Arc<Clock>,
    ) -> Result<Self> {
        let cache = Arc::new(SessionCache::new());
        let store = Arc::new(OfflineSessionStore::open(config.db_path.clone())?);
        let debouncer = Arc::new(RefreshDebouncer::new(
            Arc::clone(&store),
            config.max_pending_refreshes,
        ));
        let sweeper = Arc::new(ExpirationSweeper::new(
            Arc::clone(&clock),
            Arc::clone(&cache),
            Arc::clone(&store),
            Arc::clone(&policies),
            config.cache_backstop_enabled,
        ));
        let manager = Arc::new(SessionManager::new(
            Arc::clone(&clock),
            Arc::clone(&cache),
            Arc::clone(&store),
            Arc::clone(&debouncer),
            Arc::clone(&sweeper),
            policies,
        ));

        Ok(Self {
            clock,
            cache,
            store,
            debouncer,
            sweeper,
            manager,
            config,
        })
    }

    /// Mount the periodic flush and sweep tasks on the scheduler with
    /// the configured intervals. Either task can be cancelled and
    /// resumed independently by name.
    pub fn start(&self, scheduler: &Scheduler) {
        self.debouncer
            .mount(scheduler, Duration::from_secs(self.config.flush_interval_secs));
        self.sweeper
            .mount(scheduler, Duration::from_secs(self.config.sweep_interval_secs));
    }
}
