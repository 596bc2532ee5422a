//! Session layer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::debounce::{DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_MAX_PENDING_REFRESHES};
use crate::session::sweeper::DEFAULT_SWEEP_INTERVAL_SECS;

/// Configuration for the session-state layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionLayerConfig {
    /// Path to the offline session database file.
    pub db_path: PathBuf,

    /// Cadence of the debounced refresh flush, in seconds.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Buffered refresh count that triggers an early flush.
    #[serde(default = "default_max_pending")]
    pub max_pending_refreshes: usize,

    /// Cadence of the expiration sweep, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Whether sweeps also run the cache's backstop TTL eviction.
    #[serde(default = "default_cache_backstop")]
    pub cache_backstop_enabled: bool,
}

fn default_flush_interval() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING_REFRESHES
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_cache_backstop() -> bool {
    true
}

impl SessionLayerConfig {
    /// Configuration with defaults for everything but the database path.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            flush_interval_secs: default_flush_interval(),
            max_pending_refreshes: default_max_pending(),
            sweep_interval_secs: default_sweep_interval(),
            cache_backstop_enabled: default_cache_backstop(),
        }
    }
}
