//! Unified error type for configuration and document handling
//!
//! Decision-level failures of the supervision engine live next to the engine;
//! this type covers the ambient concerns shared by every crate: invalid
//! configuration, unreadable files and undecodable agency documents.

use serde::{Deserialize, Serialize};

/// Error type for core operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ReplogError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// File system error
    #[error("I/O error: {message}")]
    Io {
        /// Error message describing the I/O failure
        message: String,
    },
}

impl ReplogError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            ReplogError::Invalid { .. } => "replog_invalid",
            ReplogError::Serialization { .. } => "replog_serialization",
            ReplogError::Io { .. } => "replog_io",
        }
    }
}

/// Standard Result type for core operations
pub type Result<T> = std::result::Result<T, ReplogError>;

impl From<std::io::Error> for ReplogError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for ReplogError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ReplogError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
