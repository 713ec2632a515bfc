// ============================================
// File: crates/iplink-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for serial-port and TUN-device operations.
//!
//! ## Error Categories
//! 1. **Serial Errors**: open and termios configuration failures
//! 2. **TUN Errors**: device creation and interface configuration failures
//! 3. **Configuration Errors**: invalid device parameters
//! 4. **System Errors**: raw I/O failures with context
//!
//! ## ⚠️ Important Note for Next Developer
//! - Would-block is never surfaced as an error; the async wrappers retry
//! - Setup failures are fatal to the process; steady-state I/O failures
//!   unwind the engine loop
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Serial Errors
    // ========================================

    /// Failed to open the serial device.
    #[error("Failed to open serial device '{path}': {reason}")]
    SerialOpenFailed {
        /// Device path
        path: String,
        /// Why the open failed
        reason: String,
    },

    /// Failed to configure the serial line.
    #[error("Failed to configure serial device '{path}': {reason}")]
    SerialConfigFailed {
        /// Device path
        path: String,
        /// Why configuration failed
        reason: String,
    },

    /// Requested baud rate has no POSIX constant.
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    // ========================================
    // TUN Device Errors
    // ========================================

    /// Failed to create the TUN device.
    #[error("Failed to create TUN device '{name}': {reason}")]
    TunCreateFailed {
        /// Requested device name
        name: String,
        /// Why creation failed
        reason: String,
    },

    /// Failed to configure the TUN interface.
    #[error("Failed to configure TUN device '{name}': {reason}")]
    TunConfigFailed {
        /// Device name
        name: String,
        /// Why configuration failed
        reason: String,
    },

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid device configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field name
        field: String,
        /// Why it is invalid
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Creates a `SerialOpenFailed` error.
    pub fn serial_open_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SerialOpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `SerialConfigFailed` error.
    pub fn serial_config_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SerialConfigFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `TunCreateFailed` error.
    pub fn tun_create_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TunCreateFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `TunConfigFailed` error.
    pub fn tun_config_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TunConfigFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::serial_open_failed("/dev/ttyS0", "permission denied");
        assert!(err.to_string().contains("/dev/ttyS0"));
        assert!(err.to_string().contains("permission denied"));

        let err = TransportError::UnsupportedBaudRate(12345);
        assert!(err.to_string().contains("12345"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io { .. }));
    }
}
