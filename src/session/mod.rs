//! Dual-tier session management.
//!
//! Online sessions live in a volatile replicated cache; sessions
//! promoted to the offline tier are persisted in redb and survive
//! logout and restarts. A debounced flush keeps durable refresh
//! timestamps eventually consistent, and an expiration sweeper reclaims
//! expired records from both tiers.

pub mod cache;
pub mod debounce;
pub mod manager;
pub mod store;
pub mod sweeper;
pub mod types;

pub use cache::SessionCache;
pub use debounce::{RefreshDebouncer, RefreshSink, REFRESH_FLUSH_TASK_NAME};
pub use manager::SessionManager;
pub use store::OfflineSessionStore;
pub use sweeper::{ExpirationSweeper, EXPIRATION_SWEEP_TASK_NAME};
pub use types::{AuthenticatedClientSession, SessionId, SessionTier, UserSession};
