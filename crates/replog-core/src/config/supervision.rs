//! Supervisor control cycle configuration

use serde::{Deserialize, Serialize};

use super::ConfigValidation;
use crate::{ReplogError, Result};

/// Settings of the supervisor control cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionConfig {
    /// How often a cycle re-reads and recomputes after a compare-and-swap
    /// conflict before giving up until the next cycle
    pub max_conflict_retries: u32,
    /// Replication factor floor for logs created without an explicit one
    pub default_min_replication_factor: usize,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            default_min_replication_factor: 2,
        }
    }
}

impl ConfigValidation for SupervisionConfig {
    fn validate(&self) -> Result<()> {
        if self.default_min_replication_factor == 0 {
            return Err(ReplogError::invalid(
                "default_min_replication_factor must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TomlConfig;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = SupervisionConfig::from_toml_str("max_conflict_retries = 7").unwrap();
        assert_eq!(config.max_conflict_retries, 7);
        assert_eq!(config.default_min_replication_factor, 2);
    }

    #[test]
    fn test_zero_replication_factor_is_rejected() {
        let err = SupervisionConfig::from_toml_str("default_min_replication_factor = 0")
            .unwrap_err();
        assert!(matches!(err, ReplogError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml_is_a_serialization_error() {
        let err = SupervisionConfig::from_toml_str("max_conflict_retries = \"many\"").unwrap_err();
        assert!(matches!(err, ReplogError::Serialization { .. }));
    }
}
