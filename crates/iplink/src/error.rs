// ============================================
// File: crates/iplink/src/error.rs
// ============================================
//! # Link Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use iplink_transport::error::TransportError;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Bridge error types.
///
/// Everything here is fatal: wire-level errors (bad checksum, short frame)
/// are handled and counted inside the engine and never surface as a
/// `LinkError`.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Failed to load the configuration file.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the configuration file
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// A configuration value violates a semantic rule.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Configuration field name
        field: String,
        /// Why it is invalid
        reason: String,
    },

    /// Error from the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
