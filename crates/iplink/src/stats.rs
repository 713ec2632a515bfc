// ============================================
// File: crates/iplink/src/stats.rs
// ============================================
//! # Link Statistics
//!
//! ## Creation Reason
//! Counts traffic and error events so an operator can inspect a running
//! bridge (SIGUSR1) without restarting it.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Plain fields, no atomics: the engine is single-threaded and owns the
//!   counters exclusively
//!
//! ## Last Modified
//! v0.1.0 - Initial statistics

use std::fmt;

/// Traffic and error counters for one bridge run.
///
/// Byte counters on the TUN side exclude the 4-byte packet-info prefix so
/// they reflect IP payload volume; UART counters are raw line bytes
/// including framing overhead.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Raw bytes read from the serial line.
    pub uart_rx_bytes: u64,
    /// Raw bytes written to the serial line.
    pub uart_tx_bytes: u64,
    /// Frames from the serial line dropped as invalid.
    pub uart_rx_errors: u64,

    /// IP bytes received from the TUN device.
    pub tun_rx_bytes: u64,
    /// IP bytes delivered to the TUN device.
    pub tun_tx_bytes: u64,
    /// IP bytes read from the TUN device while the link was down.
    pub tun_rx_ignored_bytes: u64,

    /// Datagrams received from the TUN device.
    pub tun_rx_frames: u64,
    /// Datagrams delivered to the TUN device.
    pub tun_tx_frames: u64,
    /// Datagrams read from the TUN device while the link was down.
    pub tun_rx_ignored_frames: u64,
}

impl Stats {
    /// Creates a zeroed counter block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tuart_rx_bytes: {}", self.uart_rx_bytes)?;
        writeln!(f, "\tuart_tx_bytes: {}", self.uart_tx_bytes)?;
        writeln!(f, "\tuart_rx_errors: {}", self.uart_rx_errors)?;
        writeln!(f, "\ttun_rx_bytes: {}", self.tun_rx_bytes)?;
        writeln!(f, "\ttun_tx_bytes: {}", self.tun_tx_bytes)?;
        writeln!(f, "\ttun_rx_ignored_bytes: {}", self.tun_rx_ignored_bytes)?;
        writeln!(f, "\ttun_rx_frames: {}", self.tun_rx_frames)?;
        writeln!(f, "\ttun_tx_frames: {}", self.tun_tx_frames)?;
        writeln!(f, "\ttun_rx_ignored_frames: {}", self.tun_rx_ignored_frames)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_all_counters() {
        let mut stats = Stats::new();
        stats.uart_rx_bytes = 42;
        stats.uart_rx_errors = 7;

        let text = stats.to_string();
        assert!(text.contains("uart_rx_bytes: 42"));
        assert!(text.contains("uart_rx_errors: 7"));
        assert!(text.contains("tun_tx_frames: 0"));
    }
}
