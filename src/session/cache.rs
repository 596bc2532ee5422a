//! Volatile session cache: the online tier.
//!
//! Holds active user sessions and their client sub-sessions. In a
//! cluster this map is replicated with last-writer-wins semantics per
//! key; a single node observes exactly the contract implemented here:
//! keyed replacement on `put`, and per-session-id synchronized mutation
//! so concurrent sub-session inserts cannot lose updates.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::realm::RealmPolicySource;

use super::types::{SessionId, UserSession};

/// In-memory cache of online user sessions.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<SessionId, UserSession>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session. Last writer wins per key.
    pub fn put(&self, session: UserSession) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(session.id, session);
        }
    }

    /// Look up a session by ID.
    pub fn get(&self, id: &SessionId) -> Option<UserSession> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(id).cloned())
    }

    /// Remove a session, returning it if it was present.
    pub fn remove(&self, id: &SessionId) -> Option<UserSession> {
        self.entries
            .write()
            .ok()
            .and_then(|mut entries| entries.remove(id))
    }

    /// Mutate one session under the write lock. Returns `false` if the
    /// session is not cached. All client-session map changes go through
    /// here so two writers cannot interleave a read-modify-write.
    pub fn update<F>(&self, id: &SessionId, f: F) -> bool
    where
        F: FnOnce(&mut UserSession),
    {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(session) = entries.get_mut(id) {
                f(session);
                return true;
            }
        }
        false
    }

    /// All cached sessions belonging to a realm.
    pub fn all_for_realm(&self, realm_id: &str) -> Vec<UserSession> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .values()
                    .filter(|s| s.realm_id == realm_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All cached sessions with a client sub-session for the given client.
    pub fn all_for_client(&self, client_id: &str) -> Vec<UserSession> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .values()
                    .filter(|s| s.client_sessions.contains_key(client_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of cached sessions in a realm.
    pub fn count_for_realm(&self, realm_id: &str) -> usize {
        self.entries
            .read()
            .map(|entries| entries.values().filter(|s| s.realm_id == realm_id).count())
            .unwrap_or(0)
    }

    /// Remove every cached session of a realm, returning how many were
    /// dropped. Used when a realm is removed.
    pub fn remove_realm(&self, realm_id: &str) -> usize {
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|_, s| s.realm_id != realm_id);
            return before - entries.len();
        }
        0
    }

    /// Backstop TTL eviction: drop entries that are expired under their
    /// realm's policy. Advisory for the online tier only; offline
    /// correctness never depends on this running.
    pub fn evict_stale(&self, policies: &dyn RealmPolicySource, clock: &Clock) -> usize {
        let now = clock.now();
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|_, session| match policies.policy_for(&session.realm_id) {
                Some(policy) => !session.is_expired(&policy, now),
                None => true,
            });
            let evicted = before - entries.len();
            if evicted > 0 {
                debug!(evicted, "Evicted stale sessions from cache");
            }
            return evicted;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::{RealmSessionPolicy, StaticPolicySource};
    use chrono::Utc;
    use std::sync::Arc;

    fn session(realm: &str, user: &str) -> UserSession {
        UserSession::new(realm.to_string(), user.to_string(), Utc::now())
    }

    #[test]
    fn test_put_get_remove() {
        let cache = SessionCache::new();
        let s = session("test", "user1");
        let id = s.id;

        cache.put(s);
        assert_eq!(cache.get(&id).unwrap().user_id, "user1");
        assert!(cache.remove(&id).is_some());
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn test_update_mutates_in_place() {
        let cache = SessionCache::new();
        let s = session("test", "user1");
        let id = s.id;
        cache.put(s);

        let now = Utc::now();
        assert!(cache.update(&id, |s| {
            s.attach_client_session("test-app", now);
        }));
        assert_eq!(cache.get(&id).unwrap().client_session_ids().len(), 1);

        assert!(!cache.update(&SessionId::new(), |_| {}));
    }

    #[test]
    fn test_realm_and_client_scans() {
        let cache = SessionCache::new();
        let now = Utc::now();

        let mut a = session("realm-a", "user1");
        a.attach_client_session("test-app", now);
        let b = session("realm-a", "user2");
        let c = session("realm-b", "user3");
        cache.put(a);
        cache.put(b);
        cache.put(c);

        assert_eq!(cache.all_for_realm("realm-a").len(), 2);
        assert_eq!(cache.count_for_realm("realm-b"), 1);
        assert_eq!(cache.all_for_client("test-app").len(), 1);
        assert_eq!(cache.remove_realm("realm-a"), 2);
        assert_eq!(cache.count_for_realm("realm-a"), 0);
    }

    #[test]
    fn test_backstop_eviction() {
        let cache = SessionCache::new();
        let clock = Arc::new(Clock::new());
        let policies = StaticPolicySource::new();
        policies.set(
            "test",
            RealmSessionPolicy {
                offline_idle_timeout_secs: 600,
                offline_max_lifespan_secs: 3600,
            },
        );

        let s = session("test", "user1");
        cache.put(s);

        assert_eq!(cache.evict_stale(&policies, &clock), 0);

        clock.set_offset(601);
        assert_eq!(cache.evict_stale(&policies, &clock), 1);
        clock.reset();
    }
}
