//! Client policy conditions: configurable vote strategies consulted by
//! client lifecycle actions (register, update).
//!
//! Strategies are selected by configuration name through a registry,
//! not by subclassing. Each condition votes `Yes`, `No`, or `Abstain`;
//! the caller populates the context from user/session lookups — this
//! module never owns session state.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signing algorithms considered secure.
const SECURE_SIGNING_ALGORITHMS: [&str; 6] =
    ["ES256", "ES384", "ES512", "PS256", "PS384", "PS512"];

/// Outcome of one condition's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Yes,
    No,
    Abstain,
}

/// Client lifecycle action being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEvent {
    Register,
    Update,
}

/// Facts a condition may consult, resolved by the caller.
#[derive(Debug, Clone)]
pub struct ClientPolicyContext {
    pub event: PolicyEvent,
    /// Realm roles of the user performing the action.
    pub user_roles: Vec<String>,
    /// Signing algorithm the client requests, if any.
    pub signing_algorithm: Option<String>,
}

/// One configurable vote strategy.
pub trait ClientPolicyCondition: Send + Sync {
    /// Configured strategy name this condition registers under.
    fn name(&self) -> &'static str;

    fn vote(&self, ctx: &ClientPolicyContext) -> Vote;
}

/// Condition configuration, dispatched by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConditionConfig {
    /// Vote `Yes` when the acting user holds one of the listed roles.
    UpdateSourceRoles {
        roles: Vec<String>,
        /// Invert the outcome (deny users who hold the roles).
        #[serde(default)]
        negative_logic: bool,
    },
    /// Refuse clients whose signing algorithm is not considered secure.
    SecureSigningAlgorithm {
        /// Applied when the client requests no algorithm.
        #[serde(default = "default_signing_algorithm")]
        default_algorithm: String,
    },
}

fn default_signing_algorithm() -> String {
    "PS256".to_string()
}

/// Votes `Yes` iff the acting user holds one of the configured roles,
/// optionally inverted.
struct UpdateSourceRolesCondition {
    roles: Vec<String>,
    negative_logic: bool,
}

impl ClientPolicyCondition for UpdateSourceRolesCondition {
    fn name(&self) -> &'static str {
        "update-source-roles"
    }

    fn vote(&self, ctx: &ClientPolicyContext) -> Vote {
        if self.roles.is_empty() {
            return Vote::Abstain;
        }
        let matched = ctx
            .user_roles
            .iter()
            .any(|role| self.roles.iter().any(|wanted| wanted == role));
        if matched != self.negative_logic {
            Vote::Yes
        } else {
            Vote::No
        }
    }
}

/// Refuses signing algorithms outside the secure set; a missing
/// algorithm falls back to the configured default.
struct SecureSigningAlgorithmCondition {
    default_algorithm: String,
}

impl ClientPolicyCondition for SecureSigningAlgorithmCondition {
    fn name(&self) -> &'static str {
        "secure-signing-algorithm"
    }

    fn vote(&self, ctx: &ClientPolicyContext) -> Vote {
        let algorithm = ctx
            .signing_algorithm
            .as_deref()
            .unwrap_or(&self.default_algorithm);
        if SECURE_SIGNING_ALGORITHMS.contains(&algorithm) {
            Vote::Yes
        } else {
            Vote::No
        }
    }
}

/// Registry mapping configured strategy names to conditions.
#[derive(Default)]
pub struct ClientPolicyRegistry {
    conditions: HashMap<&'static str, Box<dyn ClientPolicyCondition>>,
}

impl ClientPolicyRegistry {
    /// Build the registry from configuration entries.
    pub fn from_config(configs: &[ConditionConfig]) -> Self {
        let mut registry = Self::default();
        for config in configs {
            let condition: Box<dyn ClientPolicyCondition> = match config {
                ConditionConfig::UpdateSourceRoles {
                    roles,
                    negative_logic,
                } => Box::new(UpdateSourceRolesCondition {
                    roles: roles.clone(),
                    negative_logic: *negative_logic,
                }),
                ConditionConfig::SecureSigningAlgorithm { default_algorithm } => {
                    Box::new(SecureSigningAlgorithmCondition {
                        default_algorithm: default_algorithm.clone(),
                    })
                }
            };
            registry.conditions.insert(condition.name(), condition);
        }
        registry
    }

    /// Evaluate one named strategy. Unknown names are an error; the
    /// policy endpoint treats a missing strategy as misconfiguration.
    pub fn evaluate(&self, name: &str, ctx: &ClientPolicyContext) -> Result<Vote> {
        match self.conditions.get(name) {
            Some(condition) => Ok(condition.vote(ctx)),
            None => bail!("Unknown client policy condition: {}", name),
        }
    }

    /// Evaluate every registered condition: any `No` denies, otherwise
    /// any `Yes` permits, otherwise the registry abstains.
    pub fn evaluate_all(&self, ctx: &ClientPolicyContext) -> Vote {
        let mut outcome = Vote::Abstain;
        for condition in self.conditions.values() {
            match condition.vote(ctx) {
                Vote::No => return Vote::No,
                Vote::Yes => outcome = Vote::Yes,
                Vote::Abstain => {}
            }
        }
        outcome
    }
}
