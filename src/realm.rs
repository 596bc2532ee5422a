//! Realm-owned session policy configuration.
//!
//! The realm store is an external collaborator; this subsystem only
//! reads idle-timeout and max-lifespan windows through the
//! [`RealmPolicySource`] trait.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Read-only session timeout policy for one realm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RealmSessionPolicy {
    /// Maximum allowed gap between refreshes before a session expires.
    #[serde(default = "default_offline_idle_timeout_secs")]
    pub offline_idle_timeout_secs: i64,

    /// Absolute session age ceiling, independent of refresh activity.
    #[serde(default = "default_offline_max_lifespan_secs")]
    pub offline_max_lifespan_secs: i64,
}

fn default_offline_idle_timeout_secs() -> i64 {
    2_592_000 // 30 days
}

fn default_offline_max_lifespan_secs() -> i64 {
    5_184_000 // 60 days
}

impl Default for RealmSessionPolicy {
    fn default() -> Self {
        Self {
            offline_idle_timeout_secs: default_offline_idle_timeout_secs(),
            offline_max_lifespan_secs: default_offline_max_lifespan_secs(),
        }
    }
}

impl RealmSessionPolicy {
    /// Idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::seconds(self.offline_idle_timeout_secs)
    }

    /// Max lifespan as a duration.
    pub fn max_lifespan(&self) -> Duration {
        Duration::seconds(self.offline_max_lifespan_secs)
    }
}

/// Collaborator interface for looking up per-realm session policy.
pub trait RealmPolicySource: Send + Sync {
    /// Policy for the given realm, or `None` if the realm is unknown.
    fn policy_for(&self, realm_id: &str) -> Option<RealmSessionPolicy>;

    /// Ids of all realms this node serves, for periodic sweeps.
    fn realm_ids(&self) -> Vec<String>;
}

/// In-memory policy source backed by a map. Used in tests and in
/// deployments that load realm configuration up front.
#[derive(Debug, Default)]
pub struct StaticPolicySource {
    policies: RwLock<HashMap<String, RealmSessionPolicy>>,
}

impl StaticPolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the policy for a realm.
    pub fn set(&self, realm_id: &str, policy: RealmSessionPolicy) {
        if let Ok(mut policies) = self.policies.write() {
            policies.insert(realm_id.to_string(), policy);
        }
    }
}

impl RealmPolicySource for StaticPolicySource {
    fn policy_for(&self, realm_id: &str) -> Option<RealmSessionPolicy> {
        self.policies
            .read()
            .ok()
            .and_then(|policies| policies.get(realm_id).copied())
    }

    fn realm_ids(&self) -> Vec<String> {
        self.policies
            .read()
            .map(|policies| policies.keys().cloned().collect())
            .unwrap_or_default()
    }
}
