//! Engine Configuration
//!
//! Settings are plain data so they can be embedded in whatever configuration
//! document the host application already loads. Every field has a default,
//! so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the orderer does when the remaining nodes can no longer make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Emit one member of the cycle anyway, ignoring its unresolved inputs,
    /// and keep going. Every mapped node ends up in the queue.
    #[default]
    Break,

    /// Leave out every node that cannot be ordered: members of a cycle and
    /// everything that reads from one.
    Drop,
}

/// Tunables for [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How dependency cycles are resolved.
    pub cycle_policy: CyclePolicy,

    /// Whether automation rules are appended to function chains.
    pub rules_enabled: bool,
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::Break,
            rules_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cycle_policy, CyclePolicy::Break);
        assert!(config.rules_enabled);
    }

    #[test]
    fn fields_are_overridable() {
        let config =
            EngineConfig::from_json(r#"{"cycle_policy": "drop", "rules_enabled": false}"#).unwrap();
        assert_eq!(config.cycle_policy, CyclePolicy::Drop);
        assert!(!config.rules_enabled);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = EngineConfig::from_json(r#"{"cycle_policy": "panic"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));
    }
}
