//! Durable offline session store backed by redb.
//!
//! Holds snapshots of sessions explicitly promoted to the offline tier:
//! - Parent table keyed by `realm/userSessionId`
//! - Child table keyed by `userSessionId/clientId`, so that cascade
//!   delete of a parent is one bounded range scan
//! - Monotonic idempotent upsert of last-refresh timestamps
//!
//! Every multi-row change happens inside a single redb write
//! transaction; readers never observe a parent without its children.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::realm::RealmSessionPolicy;

use super::types::{AuthenticatedClientSession, SessionId, SessionTier, UserSession};

/// Parent table: "realm/userSessionId" -> MessagePack<OfflineSessionRow>.
const OFFLINE_SESSIONS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("offline_user_sessions");

/// Child table: "userSessionId/clientId" -> MessagePack<OfflineClientRow>.
const OFFLINE_CLIENTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("offline_client_sessions");

/// Durable parent row: projection of a promoted user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OfflineSessionRow {
    user_id: String,
    started_at: DateTime<Utc>,
    last_session_refresh: DateTime<Utc>,
    /// Session shell at promotion time, client-session map excluded.
    snapshot: UserSession,
}

/// Durable child row: one persisted client sub-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OfflineClientRow {
    last_session_refresh: DateTime<Utc>,
    snapshot: AuthenticatedClientSession,
}

/// Realm ids are collaborator-supplied opaque strings; the key scheme
/// reserves '/' as the separator, so a realm id containing it would
/// alias another realm's key range.
fn check_realm_id(realm_id: &str) -> Result<()> {
    if realm_id.is_empty() || realm_id.contains('/') {
        bail!("Invalid realm id: {:?}", realm_id);
    }
    Ok(())
}

/// Parent key. Session ids are hex and never contain the separator;
/// realm ids are validated by [`check_realm_id`].
fn session_key(realm_id: &str, id: SessionId) -> String {
    format!("{}/{}", realm_id, id.to_hex())
}

fn client_key(id: SessionId, client_id: &str) -> String {
    format!("{}/{}", id.to_hex(), client_id)
}

/// Exclusive upper bound for a prefix range scan. The trailing '/'
/// separator is bumped to '0', its successor in ASCII order, so every
/// continuation of the prefix sorts below the bound.
fn range_end(prefix: &str) -> String {
    debug_assert!(prefix.ends_with('/'));
    format!("{}0", &prefix[..prefix.len() - 1])
}

/// Durable store for offline session records.
pub struct OfflineSessionStore {
    db: Database,
}

impl OfflineSessionStore {
    /// Open or create the offline session store at the given path.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let db = Database::create(&path)
            .with_context(|| format!("Failed to open offline session database: {:?}", path))?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Persist a new offline record for a session, together with the
    /// selected client sessions. Fails if a record for this session id
    /// already exists; repeated promotion goes through
    /// [`Self::add_or_update_client`] instead.
    pub fn persist(
        &self,
        session: &UserSession,
        selected: &[AuthenticatedClientSession],
    ) -> Result<()> {
        check_realm_id(&session.realm_id)?;
        let key = session_key(&session.realm_id, session.id);

        let mut shell = session.clone();
        shell.client_sessions.clear();
        shell.tier = SessionTier {
            online: false,
            offline: true,
        };

        let row = OfflineSessionRow {
            user_id: session.user_id.clone(),
            started_at: session.started_at,
            last_session_refresh: session.last_session_refresh,
            snapshot: shell,
        };
        let parent_data = rmp_serde::to_vec(&row).context("Failed to serialize session row")?;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
            if sessions.get(key.as_str())?.is_some() {
                bail!("Offline session record already exists: {}", session.id);
            }
            sessions.insert(key.as_str(), parent_data.as_slice())?;

            let mut clients = write_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
            for client_session in selected {
                let child = OfflineClientRow {
                    last_session_refresh: client_session.last_session_refresh,
                    snapshot: client_session.clone(),
                };
                let data = rmp_serde::to_vec(&child).context("Failed to serialize client row")?;
                let child_key = client_key(session.id, &client_session.client_id);
                clients.insert(child_key.as_str(), data.as_slice())?;
            }
        }
        write_txn.commit()?;

        debug!(
            session = %session.id,
            clients = selected.len(),
            "Persisted offline session record"
        );
        Ok(())
    }

    /// Whether an offline record exists for this session.
    pub fn has(&self, realm_id: &str, id: SessionId) -> Result<bool> {
        check_realm_id(realm_id)?;
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
        Ok(sessions.get(session_key(realm_id, id).as_str())?.is_some())
    }

    /// Reconstruct a user session from its durable rows: the parent
    /// shell plus all persisted client sub-sessions.
    pub fn get(&self, realm_id: &str, id: SessionId) -> Result<Option<UserSession>> {
        check_realm_id(realm_id)?;
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(OFFLINE_SESSIONS_TABLE)?;

        let key = session_key(realm_id, id);
        let row: OfflineSessionRow = match sessions.get(key.as_str())? {
            Some(value) => rmp_serde::from_slice(value.value())
                .context("Failed to deserialize offline session row")?,
            None => return Ok(None),
        };

        let mut session = row.snapshot;
        session.last_session_refresh = row.last_session_refresh;

        let clients = read_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
        let prefix = format!("{}/", id.to_hex());
        let end = range_end(&prefix);
        for entry in clients.range(prefix.as_str()..end.as_str())? {
            let (_, value) = entry?;
            let child: OfflineClientRow = rmp_serde::from_slice(value.value())
                .context("Failed to deserialize offline client row")?;
            let mut client_session = child.snapshot;
            client_session.last_session_refresh = child.last_session_refresh;
            session
                .client_sessions
                .insert(client_session.client_id.clone(), client_session);
        }

        Ok(Some(session))
    }

    /// Add or update one client session's durable row under an existing
    /// record, leaving the rest of the record untouched. The parent's
    /// last-refresh rises to the client's timestamp if newer.
    pub fn add_or_update_client(
        &self,
        realm_id: &str,
        id: SessionId,
        client_session: &AuthenticatedClientSession,
    ) -> Result<()> {
        check_realm_id(realm_id)?;
        let key = session_key(realm_id, id);
        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
            let mut row: OfflineSessionRow = match sessions.get(key.as_str())? {
                Some(value) => rmp_serde::from_slice(value.value())
                    .context("Failed to deserialize offline session row")?,
                None => bail!("No offline session record for session: {}", id),
            };
            if client_session.last_session_refresh > row.last_session_refresh {
                row.last_session_refresh = client_session.last_session_refresh;
                let data = rmp_serde::to_vec(&row).context("Failed to serialize session row")?;
                sessions.insert(key.as_str(), data.as_slice())?;
            }

            let child_key = client_key(id, &client_session.client_id);
            let mut clients = write_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
            let prior_refresh = match clients.get(child_key.as_str())? {
                Some(value) => Some(
                    rmp_serde::from_slice::<OfflineClientRow>(value.value())
                        .context("Failed to deserialize offline client row")?
                        .last_session_refresh,
                ),
                None => None,
            };

            // The child's refresh timestamp is monotonic too: an
            // out-of-order merge updates the snapshot but never rewinds
            // the durable timestamp.
            let mut snapshot = client_session.clone();
            if let Some(prior) = prior_refresh {
                if prior > snapshot.last_session_refresh {
                    snapshot.last_session_refresh = prior;
                }
            }
            let child = OfflineClientRow {
                last_session_refresh: snapshot.last_session_refresh,
                snapshot,
            };
            let data = rmp_serde::to_vec(&child).context("Failed to serialize client row")?;
            clients.insert(child_key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Idempotent monotonic upsert: the durable last-refresh becomes
    /// `max(current, timestamp)`. Safe to call redundantly or out of
    /// order. Returns `false` if no record exists (it may already have
    /// been swept), which is not an error.
    pub fn update_last_refresh(
        &self,
        realm_id: &str,
        id: SessionId,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        check_realm_id(realm_id)?;
        let key = session_key(realm_id, id);
        let write_txn = self.db.begin_write()?;
        let found = {
            let mut sessions = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
            let existing: Option<OfflineSessionRow> = match sessions.get(key.as_str())? {
                Some(value) => Some(
                    rmp_serde::from_slice(value.value())
                        .context("Failed to deserialize offline session row")?,
                ),
                None => None,
            };
            match existing {
                Some(mut row) => {
                    if timestamp > row.last_session_refresh {
                        row.last_session_refresh = timestamp;
                        let data =
                            rmp_serde::to_vec(&row).context("Failed to serialize session row")?;
                        sessions.insert(key.as_str(), data.as_slice())?;
                    }
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(found)
    }

    /// Remove one offline record, cascading to its client rows.
    /// Returns whether a record was removed.
    pub fn remove(&self, realm_id: &str, id: SessionId) -> Result<bool> {
        check_realm_id(realm_id)?;
        let key = session_key(realm_id, id);
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
            let removed = sessions.remove(key.as_str())?.is_some();
            if removed {
                let mut clients = write_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
                Self::remove_client_rows(&mut clients, id)?;
            }
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every record of the realm whose refresh gap exceeds the
    /// idle timeout or whose age exceeds the max lifespan, cascading to
    /// client rows. The expiry decision reads each row's current
    /// last-refresh inside the same write transaction as the delete, so
    /// a concurrently committed refresh is never silently lost.
    ///
    /// Returns the ids of removed sessions. Safe to interrupt and
    /// re-run; each run is independently correct against current state.
    pub fn remove_expired(
        &self,
        realm_id: &str,
        policy: &RealmSessionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionId>> {
        check_realm_id(realm_id)?;
        let prefix = format!("{}/", realm_id);
        let end = range_end(&prefix);

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(OFFLINE_SESSIONS_TABLE)?;

            let mut expired: Vec<(String, SessionId)> = Vec::new();
            for entry in sessions.range(prefix.as_str()..end.as_str())? {
                let (key, value) = entry?;
                match rmp_serde::from_slice::<OfflineSessionRow>(value.value()) {
                    Ok(row) => {
                        let idle_expired = now > row.last_session_refresh + policy.idle_timeout();
                        let lifespan_expired = now > row.started_at + policy.max_lifespan();
                        if idle_expired || lifespan_expired {
                            if let Some(id) =
                                key.value().rsplit('/').next().and_then(SessionId::from_hex)
                            {
                                expired.push((key.value().to_string(), id));
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            key = key.value(),
                            error = %e,
                            "Failed to deserialize offline session row, removing"
                        );
                        if let Some(id) =
                            key.value().rsplit('/').next().and_then(SessionId::from_hex)
                        {
                            expired.push((key.value().to_string(), id));
                        }
                    }
                }
            }

            let mut clients = write_txn.open_table(OFFLINE_CLIENTS_TABLE)?;
            let mut removed = Vec::with_capacity(expired.len());
            for (key, id) in expired {
                sessions.remove(key.as_str())?;
                Self::remove_client_rows(&mut clients, id)?;
                removed.push(id);
            }
            removed
        };
        write_txn.commit()?;

        if !removed.is_empty() {
            debug!(
                realm = realm_id,
                removed = removed.len(),
                "Removed expired offline sessions"
            );
        }
        Ok(removed)
    }

    /// Number of offline session records in a realm.
    pub fn count(&self, realm_id: &str) -> Result<usize> {
        check_realm_id(realm_id)?;
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
        let prefix = format!("{}/", realm_id);
        let end = range_end(&prefix);
        let mut count = 0;
        for entry in sessions.range(prefix.as_str()..end.as_str())? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of persisted client-session rows across a realm's records.
    pub fn client_session_count(&self, realm_id: &str) -> Result<usize> {
        check_realm_id(realm_id)?;
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(OFFLINE_SESSIONS_TABLE)?;
        let clients = read_txn.open_table(OFFLINE_CLIENTS_TABLE)?;

        let prefix = format!("{}/", realm_id);
        let end = range_end(&prefix);
        let mut count = 0;
        for entry in sessions.range(prefix.as_str()..end.as_str())? {
            let (key, _) = entry?;
            if let Some(id) = key.value().rsplit('/').next().and_then(SessionId::from_hex) {
                let child_prefix = format!("{}/", id.to_hex());
                let child_end = range_end(&child_prefix);
                for child in clients.range(child_prefix.as_str()..child_end.as_str())? {
                    child?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Range-delete all client rows belonging to one session inside the
    /// caller's write transaction.
    fn remove_client_rows(clients: &mut redb::Table<&str, &[u8]>, id: SessionId) -> Result<()> {
        let prefix = format!("{}/", id.to_hex());
        let end = range_end(&prefix);
        let keys: Vec<String> = clients
            .range(prefix.as_str()..end.as_str())?
            .map(|entry| entry.map(|(key, _)| key.value().to_string()))
            .collect::<Result<_, _>>()?;
        for key in keys {
            clients.remove(key.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn test_store() -> (OfflineSessionStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offline-sessions.redb");
        let store = OfflineSessionStore::open(path).unwrap();
        (store, dir)
    }

    fn session_with_clients(
        realm: &str,
        user: &str,
        clients: &[&str],
    ) -> (UserSession, Vec<AuthenticatedClientSession>) {
        let now = Utc::now();
        let mut session = UserSession::new(realm.to_string(), user.to_string(), now);
        let attached = clients
            .iter()
            .map(|c| session.attach_client_session(c, now))
            .collect();
        (session, attached)
    }

    #[test]
    fn test_persist_and_get_reconstructs_client_set() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("test", "user1", &["app-a", "app-b"]);

        store.persist(&session, &clients).unwrap();

        let found = store.get("test", session.id).unwrap().unwrap();
        assert_eq!(found.user_id, "user1");
        assert!(found.tier.is_offline());
        assert!(!found.tier.is_online());
        let mut ids = found.client_session_ids();
        ids.sort();
        assert_eq!(ids, vec!["app-a".to_string(), "app-b".to_string()]);
    }

    #[test]
    fn test_persist_subset_only() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("test", "user1", &["app-a", "app-b"]);

        // Promote only the first client session
        store.persist(&session, &clients[..1]).unwrap();

        let found = store.get("test", session.id).unwrap().unwrap();
        assert_eq!(found.client_session_ids(), vec!["app-a".to_string()]);
    }

    #[test]
    fn test_persist_twice_fails() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("test", "user1", &["app-a"]);

        store.persist(&session, &clients).unwrap();
        let result = store.persist(&session, &clients);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
    }

    #[test]
    fn test_unknown_session_is_absent() {
        let (store, _dir) = test_store();
        assert!(store.get("test", SessionId::new()).unwrap().is_none());
        assert!(!store.has("test", SessionId::new()).unwrap());
    }

    #[test]
    fn test_update_last_refresh_is_monotonic() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("test", "user1", &["app-a"]);
        let t0 = session.last_session_refresh;
        store.persist(&session, &clients).unwrap();

        // Out-of-order updates converge on the maximum
        assert!(store
            .update_last_refresh("test", session.id, t0 + Duration::seconds(100))
            .unwrap());
        assert!(store
            .update_last_refresh("test", session.id, t0 + Duration::seconds(50))
            .unwrap());
        assert!(store
            .update_last_refresh("test", session.id, t0 + Duration::seconds(100))
            .unwrap());

        let found = store.get("test", session.id).unwrap().unwrap();
        assert_eq!(found.last_session_refresh, t0 + Duration::seconds(100));

        // Unknown id is not an error
        assert!(!store
            .update_last_refresh("test", SessionId::new(), t0)
            .unwrap());
    }

    #[test]
    fn test_remove_cascades_to_client_rows() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("test", "user1", &["app-a", "app-b"]);
        store.persist(&session, &clients).unwrap();

        assert_eq!(store.client_session_count("test").unwrap(), 2);
        assert!(store.remove("test", session.id).unwrap());
        assert_eq!(store.count("test").unwrap(), 0);
        assert_eq!(store.client_session_count("test").unwrap(), 0);
        assert!(!store.remove("test", session.id).unwrap());
    }

    #[test]
    fn test_remove_expired_honors_idle_and_lifespan() {
        let (store, _dir) = test_store();
        let policy = RealmSessionPolicy {
            offline_idle_timeout_secs: 600,
            offline_max_lifespan_secs: 86_400,
        };

        let (stale, stale_clients) = session_with_clients("test", "user1", &["app-a"]);
        let (fresh, fresh_clients) = session_with_clients("test", "user2", &["app-a"]);
        store.persist(&stale, &stale_clients).unwrap();
        store.persist(&fresh, &fresh_clients).unwrap();

        let now = fresh.last_session_refresh;
        store
            .update_last_refresh("test", fresh.id, now + Duration::seconds(500))
            .unwrap();

        // Idle timeout elapsed for the stale session only
        let removed = store
            .remove_expired("test", &policy, now + Duration::seconds(700))
            .unwrap();
        assert_eq!(removed, vec![stale.id]);
        assert_eq!(store.count("test").unwrap(), 1);
        assert_eq!(store.client_session_count("test").unwrap(), 1);

        // Max lifespan eventually removes the refreshed session too
        let removed = store
            .remove_expired("test", &policy, now + Duration::seconds(86_500))
            .unwrap();
        assert_eq!(removed, vec![fresh.id]);
        assert_eq!(store.count("test").unwrap(), 0);
    }

    #[test]
    fn test_remove_expired_scoped_to_realm() {
        let (store, _dir) = test_store();
        let policy = RealmSessionPolicy {
            offline_idle_timeout_secs: 600,
            offline_max_lifespan_secs: 3600,
        };

        let (a, a_clients) = session_with_clients("realm-a", "user1", &["app"]);
        let (b, b_clients) = session_with_clients("realm-b", "user2", &["app"]);
        store.persist(&a, &a_clients).unwrap();
        store.persist(&b, &b_clients).unwrap();

        let later = a.last_session_refresh + Duration::seconds(5000);
        let removed = store.remove_expired("realm-a", &policy, later).unwrap();
        assert_eq!(removed, vec![a.id]);
        assert_eq!(store.count("realm-b").unwrap(), 1);
    }

    #[test]
    fn test_add_or_update_client_merges() {
        let (store, _dir) = test_store();
        let (mut session, clients) = session_with_clients("test", "user1", &["app-a"]);
        store.persist(&session, &clients).unwrap();

        // Later client session added to the online session, then merged
        let later = session.last_session_refresh + Duration::seconds(60);
        let extra = session.attach_client_session("app-b", later);
        store
            .add_or_update_client("test", session.id, &extra)
            .unwrap();

        let found = store.get("test", session.id).unwrap().unwrap();
        let mut ids = found.client_session_ids();
        ids.sort();
        assert_eq!(ids, vec!["app-a".to_string(), "app-b".to_string()]);
        // Parent refresh rose to the newest client refresh
        assert_eq!(found.last_session_refresh, later);

        // Merging under a missing parent is an error
        let orphan = AuthenticatedClientSession::new(SessionId::new(), "app".to_string(), later);
        assert!(store
            .add_or_update_client("test", SessionId::new(), &orphan)
            .is_err());
    }

    #[test]
    fn test_add_or_update_client_never_rewinds_refresh() {
        let (store, _dir) = test_store();
        let (mut session, clients) = session_with_clients("test", "user1", &["app-a"]);
        let t0 = session.last_session_refresh;
        store.persist(&session, &clients).unwrap();

        let newer = session.attach_client_session("app-a", t0 + Duration::seconds(120));
        store
            .add_or_update_client("test", session.id, &newer)
            .unwrap();

        // A stale merge of the same client keeps the newer timestamp
        let stale = AuthenticatedClientSession::new(
            session.id,
            "app-a".to_string(),
            t0 + Duration::seconds(30),
        );
        store
            .add_or_update_client("test", session.id, &stale)
            .unwrap();

        let found = store.get("test", session.id).unwrap().unwrap();
        let client = &found.client_sessions["app-a"];
        assert_eq!(client.last_session_refresh, t0 + Duration::seconds(120));
        assert_eq!(found.last_session_refresh, t0 + Duration::seconds(120));
    }

    #[test]
    fn test_range_scans_include_boundary_client_ids() {
        let (store, _dir) = test_store();
        // Client ids starting at both ends of the printable byte range
        let (session, clients) =
            session_with_clients("test", "user1", &["0app", "app", "zz-app"]);
        store.persist(&session, &clients).unwrap();

        assert_eq!(store.count("test").unwrap(), 1);
        assert_eq!(store.client_session_count("test").unwrap(), 3);

        let found = store.get("test", session.id).unwrap().unwrap();
        let mut ids = found.client_session_ids();
        ids.sort();
        assert_eq!(
            ids,
            vec!["0app".to_string(), "app".to_string(), "zz-app".to_string()]
        );

        let policy = RealmSessionPolicy {
            offline_idle_timeout_secs: 600,
            offline_max_lifespan_secs: 3600,
        };
        let later = session.last_session_refresh + Duration::seconds(5000);
        let removed = store.remove_expired("test", &policy, later).unwrap();
        assert_eq!(removed, vec![session.id]);
        assert_eq!(store.client_session_count("test").unwrap(), 0);
    }

    #[test]
    fn test_realm_scans_do_not_leak_into_prefix_neighbors() {
        let (store, _dir) = test_store();
        // "a" and "ab" share a key prefix but are distinct realms
        let (short, short_clients) = session_with_clients("a", "user1", &["app"]);
        let (long, long_clients) = session_with_clients("ab", "user2", &["app"]);
        store.persist(&short, &short_clients).unwrap();
        store.persist(&long, &long_clients).unwrap();

        assert_eq!(store.count("a").unwrap(), 1);
        assert_eq!(store.count("ab").unwrap(), 1);
        assert_eq!(store.client_session_count("a").unwrap(), 1);

        let policy = RealmSessionPolicy {
            offline_idle_timeout_secs: 600,
            offline_max_lifespan_secs: 3600,
        };
        let later = short.last_session_refresh + Duration::seconds(5000);
        let removed = store.remove_expired("a", &policy, later).unwrap();
        assert_eq!(removed, vec![short.id]);
        assert_eq!(store.count("ab").unwrap(), 1);
    }

    #[test]
    fn test_realm_id_with_separator_is_rejected() {
        let (store, _dir) = test_store();
        let (session, clients) = session_with_clients("a/b", "user1", &["app"]);

        let result = store.persist(&session, &clients);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid realm id"));

        assert!(store.get("a/b", session.id).is_err());
        assert!(store.count("a/b").is_err());
        assert!(store.remove("", session.id).is_err());
    }
}
