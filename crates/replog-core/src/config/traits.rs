//! Configuration traits for validation and file loading

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::{ReplogError, Result};

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate configuration parameters
    fn validate(&self) -> Result<()>;
}

/// Trait for configuration loaded from TOML files.
///
/// Missing keys fall back to the type's serde defaults; the loaded value is
/// validated before it is returned.
pub trait TomlConfig: DeserializeOwned + ConfigValidation + Sized {
    /// Parse and validate a TOML document
    fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplogError::io(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

impl<T: DeserializeOwned + ConfigValidation> TomlConfig for T {}
