//! Session manager facade.
//!
//! Orchestrates promotion of online sessions to the offline tier,
//! idempotent merge of additional client sessions, lookups that fall
//! back from cache to the durable store, the lightweight refresh path,
//! and per-tier removal.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::realm::RealmPolicySource;

use super::cache::SessionCache;
use super::debounce::RefreshDebouncer;
use super::store::OfflineSessionStore;
use super::sweeper::ExpirationSweeper;
use super::types::{AuthenticatedClientSession, SessionId, UserSession};

/// Facade over both session tiers.
pub struct SessionManager {
    clock: Arc<Clock>,
    cache: Arc<SessionCache>,
    store: Arc<OfflineSessionStore>,
    debouncer: Arc<RefreshDebouncer>,
    sweeper: Arc<ExpirationSweeper>,
    policies: Arc<dyn RealmPolicySource>,
}

impl SessionManager {
    pub fn new(
        clock: Arc<Clock>,
        cache: Arc<SessionCache>,
        store: Arc<OfflineSessionStore>,
        debouncer: Arc<RefreshDebouncer>,
        sweeper: Arc<ExpirationSweeper>,
        policies: Arc<dyn RealmPolicySource>,
    ) -> Self {
        Self {
            clock,
            cache,
            store,
            debouncer,
            sweeper,
            policies,
        }
    }

    /// Promote a session to the offline tier, or merge one more client
    /// session into its existing record.
    ///
    /// First promotion snapshots the user session with exactly the
    /// given client session; other client sessions of the same user
    /// session are not implicitly included. Repeated calls merge: only
    /// the given client session's durable row is added or updated.
    /// Idempotent: repeating with the same arguments yields the same
    /// durable state as a single call.
    pub fn create_or_update_offline_session(
        &self,
        client_session: &AuthenticatedClientSession,
        user_session: &UserSession,
    ) -> Result<()> {
        if self.store.has(&user_session.realm_id, user_session.id)? {
            self.store.add_or_update_client(
                &user_session.realm_id,
                user_session.id,
                client_session,
            )?;
        } else {
            self.store
                .persist(user_session, std::slice::from_ref(client_session))?;
            debug!(
                session = %user_session.id,
                client = %client_session.client_id,
                "Promoted session to offline tier"
            );
        }

        // The online copy, if cached, now also lives offline
        self.cache.update(&user_session.id, |s| {
            s.tier.offline = true;
        });
        Ok(())
    }

    /// Look up an offline session. The durable store is authoritative;
    /// the cache holds the online tier's client set, which may differ
    /// from the persisted subset, so offline reads go to the store.
    ///
    /// A hit whose timestamps have already expired under the realm
    /// policy is reclaimed opportunistically and reported absent.
    /// Unknown ids return `Ok(None)`, never an error.
    pub fn find_offline_user_session(
        &self,
        realm_id: &str,
        id: SessionId,
    ) -> Result<Option<UserSession>> {
        let session = match self.store.get(realm_id, id)? {
            Some(session) => session,
            None => return Ok(None),
        };

        if let Some(policy) = self.policies.policy_for(realm_id) {
            if session.is_expired(&policy, self.clock.now()) {
                debug!(session = %id, "Offline session expired on lookup, reclaiming");
                self.store.remove(realm_id, id)?;
                self.cache.remove(&id);
                return Ok(None);
            }
        }
        Ok(Some(session))
    }

    /// Lightweight refresh on token use: the cache entry is updated
    /// synchronously, the durable timestamp is enqueued for the next
    /// debounced flush.
    pub fn refresh_offline_session(&self, realm_id: &str, id: SessionId) {
        let now = self.clock.now();
        self.cache.update(&id, |s| s.refresh(now));
        self.debouncer.enqueue(realm_id, id, now);
    }

    /// On-demand expiration sweep of one realm. Returns the count removed.
    pub fn remove_expired(&self, realm_id: &str) -> Result<usize> {
        self.sweeper.sweep_realm(realm_id)
    }

    /// Sweep all realms, skipping failed ones. Returns the total removed.
    pub fn sweep_all(&self) -> usize {
        self.sweeper.sweep()
    }

    /// Session count for one realm in the requested tier.
    pub fn user_sessions_count(&self, realm_id: &str, offline: bool) -> Result<usize> {
        if offline {
            self.store.count(realm_id)
        } else {
            Ok(self.cache.count_for_realm(realm_id))
        }
    }

    /// Logout from the online tier: drop the cache entry. The offline
    /// record, if any, is untouched.
    pub fn remove_online_session(&self, id: SessionId) -> bool {
        self.cache.remove(&id).is_some()
    }

    /// Revoke the offline record, cascading to its client rows. The
    /// online copy, if cached, is untouched apart from its tier flag.
    pub fn remove_offline_session(&self, realm_id: &str, id: SessionId) -> Result<bool> {
        let removed = self.store.remove(realm_id, id)?;
        if removed {
            self.cache.update(&id, |s| {
                s.tier.offline = false;
            });
        }
        Ok(removed)
    }
}
