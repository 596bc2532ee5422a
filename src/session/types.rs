//! Session model types: user sessions and their client sub-sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::realm::RealmSessionPolicy;

/// Unique session identifier (16-byte random value, hex-encoded for storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(rand::random())
    }

    /// Convert to hex string for storage keys.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 16 {
            return None;
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Some(Self(arr))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Which storage tiers currently hold a session. A session can live in
/// both tiers at once; each tier is removed independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTier {
    pub online: bool,
    pub offline: bool,
}

impl SessionTier {
    /// Tier of a freshly created (cache-resident) session.
    pub fn online() -> Self {
        Self {
            online: true,
            offline: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }
}

/// One client's participation in a user session.
///
/// Owned exclusively by its parent [`UserSession`]; `user_session_id` is
/// a back-reference only, never an ownership edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedClientSession {
    /// Client session ID.
    pub id: SessionId,

    /// Owning user session.
    pub user_session_id: SessionId,

    /// Client this sub-session belongs to.
    pub client_id: String,

    /// Last refresh time for this client's participation.
    pub last_session_refresh: DateTime<Utc>,

    /// Opaque protocol notes as key → value.
    pub notes: HashMap<String, String>,
}

impl AuthenticatedClientSession {
    /// Create a new client session under the given user session.
    pub fn new(user_session_id: SessionId, client_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_session_id,
            client_id,
            last_session_refresh: now,
            notes: HashMap::new(),
        }
    }

    /// Update last refresh time.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.last_session_refresh = now;
    }

    /// Get a protocol note.
    pub fn note(&self, name: &str) -> Option<&str> {
        self.notes.get(name).map(|s| s.as_str())
    }

    /// Set a protocol note.
    pub fn set_note(&mut self, name: String, value: String) {
        self.notes.insert(name, value);
    }
}

/// One authenticated principal's session within a realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    /// Session ID, unique per realm across both tiers.
    pub id: SessionId,

    /// Owning realm.
    pub realm_id: String,

    /// Authenticated user.
    pub user_id: String,

    /// Session creation time.
    pub started_at: DateTime<Utc>,

    /// Last refresh time (updated on token use).
    pub last_session_refresh: DateTime<Utc>,

    /// Storage tiers currently holding this session.
    pub tier: SessionTier,

    /// Client sub-sessions keyed by client ID. Deleting the user
    /// session deletes all of these.
    pub client_sessions: HashMap<String, AuthenticatedClientSession>,
}

impl UserSession {
    /// Create a new online session for a user in a realm.
    pub fn new(realm_id: String, user_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            realm_id,
            user_id,
            started_at: now,
            last_session_refresh: now,
            tier: SessionTier::online(),
            client_sessions: HashMap::new(),
        }
    }

    /// Create and attach a client sub-session, returning a clone of it.
    pub fn attach_client_session(
        &mut self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AuthenticatedClientSession {
        let client_session = AuthenticatedClientSession::new(self.id, client_id.to_string(), now);
        self.client_sessions
            .insert(client_id.to_string(), client_session.clone());
        client_session
    }

    /// Update last refresh time.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.last_session_refresh = now;
    }

    /// A session is expired when the refresh gap exceeds the idle
    /// timeout or its absolute age exceeds the max lifespan.
    pub fn is_expired(&self, policy: &RealmSessionPolicy, now: DateTime<Utc>) -> bool {
        now > self.last_session_refresh + policy.idle_timeout()
            || now > self.started_at + policy.max_lifespan()
    }

    /// Client IDs of all attached client sessions.
    pub fn client_session_ids(&self) -> Vec<String> {
        self.client_sessions.keys().cloned().collect()
    }
}
