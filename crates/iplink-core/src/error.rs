// ============================================
// File: crates/iplink-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Wire protocol error types.
///
/// All of these are locally recoverable at the link layer: the engine drops
/// the offending frame, counts it, and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Frame is shorter than the minimum packet (type byte + checksum).
    #[error("Frame too short: {len} bytes (minimum {min})")]
    FrameTooShort {
        /// Actual frame length
        len: usize,
        /// Minimum valid length
        min: usize,
    },

    /// Trailing checksum does not match the payload.
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum carried in the frame trailer
        expected: u32,
        /// Checksum computed over the received payload
        actual: u32,
    },
}
