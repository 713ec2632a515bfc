// ============================================
// File: crates/iplink-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the capability traits the link engine consumes, so the engine
//! can be driven by real devices in production and by in-memory mocks in
//! tests.
//!
//! ## Main Functionality
//! - [`SerialLink`]: byte-stream read/write on the UART side
//! - [`TunInterface`]: datagram recv/send plus link up/down on the TUN side
//! - [`TunOptions`]: TUN device creation parameters
//!
//! ## Design Philosophy
//! - The engine is generic over both traits; dispatch is monomorphized
//! - Every async method resolves only when the underlying descriptor was
//!   ready AND the operation completed, so awaiting one of these futures
//!   doubles as a readiness subscription
//! - Would-block never escapes an implementation
//!
//! ## ⚠️ Important Note for Next Developer
//! - Methods take `&self`; implementations use interior readiness state
//! - Short reads and writes are normal and the caller's problem
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// SerialLink Trait
// ============================================

/// Abstract interface for the serial byte stream.
///
/// # Example
/// ```ignore
/// async fn drain<S: SerialLink>(uart: &S) -> Result<()> {
///     let mut buf = [0u8; 4096];
///     loop {
///         let n = uart.read(&mut buf).await?;
///         // feed buf[..n] into the frame decoder
///     }
/// }
/// ```
#[async_trait]
pub trait SerialLink: Send + Sync {
    /// Reads available bytes into `buf`, waiting until the line is readable.
    ///
    /// # Returns
    /// Number of bytes read; may be any value up to `buf.len()`.
    ///
    /// # Errors
    /// Returns error on a real I/O failure (never on would-block).
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes a prefix of `buf`, waiting until the line accepts output.
    ///
    /// # Returns
    /// Number of bytes accepted by the kernel; short writes are normal.
    ///
    /// # Errors
    /// Returns error on a real I/O failure (never on would-block).
    async fn write(&self, buf: &[u8]) -> Result<usize>;
}

// ============================================
// TunInterface Trait
// ============================================

/// Abstract interface for the TUN device.
///
/// # Data Format
/// Every datagram read from or written to the device carries the 4-byte
/// kernel packet-info prefix (`{flags: u16, proto: u16}`); the link engine
/// transports the prefix verbatim.
#[async_trait]
pub trait TunInterface: Send + Sync {
    /// Receives one datagram into `buf`, waiting until one is available.
    ///
    /// # Returns
    /// Length of the datagram, including the packet-info prefix.
    ///
    /// # Errors
    /// Returns error on a real I/O failure (never on would-block).
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;

    /// Sends one datagram (packet-info prefix included).
    ///
    /// # Errors
    /// Returns error on a real I/O failure (never on would-block).
    async fn send(&self, buf: &[u8]) -> Result<usize>;

    /// Waits until the device would accept a datagram.
    ///
    /// The engine uses this to gate dequeuing a received frame: the frame is
    /// only popped and validated once the device can take the result.
    async fn writable(&self) -> Result<()>;

    /// Brings the interface up or down.
    ///
    /// Not idempotent at this level; the engine tracks the current state and
    /// only calls this on transitions.
    ///
    /// # Errors
    /// Returns error if the interface flags cannot be changed.
    async fn set_up(&self, up: bool) -> Result<()>;

    /// Returns the interface name as assigned by the kernel.
    fn name(&self) -> &str;

    /// Returns the interface MTU.
    fn mtu(&self) -> u16;
}

// ============================================
// TunOptions
// ============================================

/// Parameters for TUN device creation.
///
/// # Example
/// ```
/// use iplink_transport::traits::TunOptions;
/// use std::net::Ipv4Addr;
///
/// let options = TunOptions::new("uart0")
///     .with_address(Ipv4Addr::new(10, 101, 0, 1))
///     .with_netmask(Ipv4Addr::new(255, 255, 255, 252))
///     .with_mtu(3600);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TunOptions {
    /// Interface name (e.g. "uart0"). May be a pattern like "tun%d".
    pub name: String,
    /// Local address of the point-to-point link.
    pub address: Ipv4Addr,
    /// Network mask.
    pub netmask: Ipv4Addr,
    /// Interface MTU.
    pub mtu: u16,
}

impl TunOptions {
    /// Creates options with defaults for a companion-board link.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Ipv4Addr::new(10, 101, 0, 1),
            netmask: Ipv4Addr::new(255, 255, 255, 252),
            mtu: 1280,
        }
    }

    /// Sets the local address.
    #[must_use]
    pub const fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = address;
        self
    }

    /// Sets the network mask.
    #[must_use]
    pub const fn with_netmask(mut self, netmask: Ipv4Addr) -> Self {
        self.netmask = netmask;
        self
    }

    /// Sets the MTU.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    /// Returns error if the name or MTU is out of range.
    pub fn validate(&self) -> Result<()> {
        use crate::error::TransportError;

        if self.name.is_empty() {
            return Err(TransportError::invalid_config(
                "name",
                "device name cannot be empty",
            ));
        }
        if self.name.len() > 15 {
            return Err(TransportError::invalid_config(
                "name",
                "device name cannot exceed 15 characters",
            ));
        }
        if self.mtu < 64 {
            return Err(TransportError::invalid_config(
                "mtu",
                "MTU must be at least 64 bytes",
            ));
        }
        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tun_options_defaults() {
        let options = TunOptions::new("uart0");
        assert_eq!(options.name, "uart0");
        assert_eq!(options.mtu, 1280);
    }

    #[test]
    fn test_tun_options_builder() {
        let options = TunOptions::new("link0")
            .with_address(Ipv4Addr::new(10, 0, 0, 1))
            .with_netmask(Ipv4Addr::new(255, 255, 0, 0))
            .with_mtu(576);

        assert_eq!(options.address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(options.netmask, Ipv4Addr::new(255, 255, 0, 0));
        assert_eq!(options.mtu, 576);
    }

    #[test]
    fn test_tun_options_validation() {
        assert!(TunOptions::new("uart0").validate().is_ok());
        assert!(TunOptions::new("").validate().is_err());
        assert!(TunOptions::new("a".repeat(20)).validate().is_err());
        assert!(TunOptions::new("uart0").with_mtu(32).validate().is_err());
        // The floor itself is allowed.
        assert!(TunOptions::new("uart0").with_mtu(64).validate().is_ok());
    }
}
