// ============================================
// File: crates/iplink-transport/src/lib.rs
// ============================================
//! # IpLink Transport - OS I/O Layer
//!
//! ## Creation Reason
//! Provides the operating-system facade for the IpLink serial IP bridge:
//! the raw serial character device on one side and the kernel TUN device
//! on the other.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: capability traits the link engine consumes
//! - [`serial`]: POSIX serial port (termios raw mode) and a mock
//! - [`tun`]: Linux TUN device (ioctl-configured) and a mock
//! - [`error`]: transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   iplink (binary)                   │
//! │                        │                            │
//! │          ┌─────────────┴─────────────┐              │
//! │          ▼                           ▼              │
//! │    iplink-core              iplink-transport        │
//! │                             You are here ◄──        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │   Local host                                             │
//! │       ▲                                                  │
//! │  ┌────┴──────┐        ┌──────────────┐                  │
//! │  │ TUN device │ ◄───► │ Link engine  │                  │
//! │  │ (IP + PI)  │       │ (iplink bin) │                  │
//! │  └───────────┘        └──────┬───────┘                  │
//! │                              │                           │
//! │                       ┌──────┴───────┐                  │
//! │                       │ Serial port  │ ◄───► remote peer │
//! │                       │ (KISS frames)│                  │
//! │                       └──────────────┘                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - TUN operations require root or CAP_NET_ADMIN
//! - Every descriptor here is non-blocking; blocking I/O would stall the
//!   single-threaded engine
//! - The TUN device is opened without IFF_NO_PI: every datagram carries the
//!   4-byte kernel packet-info prefix, and the engine forwards it verbatim
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod serial;
pub mod traits;
pub mod tun;

pub use error::{Result, TransportError};
pub use serial::MockSerial;
#[cfg(target_os = "linux")]
pub use serial::SerialPort;
pub use traits::{SerialLink, TunInterface, TunOptions};
pub use tun::MockTun;
#[cfg(target_os = "linux")]
pub use tun::LinuxTun;
