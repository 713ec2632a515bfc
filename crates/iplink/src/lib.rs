// ============================================
// File: crates/iplink/src/lib.rs
// ============================================
//! # IpLink - Serial IP Bridge
//!
//! ## Creation Reason
//! Bridges a kernel TUN interface to a raw serial character device so IP
//! datagrams flow transparently between the local host and a single remote
//! peer over a UART: companion boards, debug consoles, anything that only
//! exposes a byte pipe.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: configuration keys, TOML loading, validation
//! - [`engine`]: the single-threaded reactor pumping both directions
//! - [`liveness`]: peer keep-alive state machine
//! - [`signals`]: process signal handling
//! - [`stats`]: traffic counters (SIGUSR1 dump)
//! - [`meter`]: optional throughput display
//! - [`hexdump`]: verbose wire debugging
//! - [`error`]: bridge error types
//!
//! ## Architecture Overview
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          iplink                                │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐      ┌──────────────┐      ┌─────────────────┐  │
//! │  │  Config  │ ───► │  LinkEngine  │ ◄─── │ Signals/Timers  │  │
//! │  └──────────┘      └──────┬───────┘      └─────────────────┘  │
//! │                           │                                    │
//! │      ┌────────────────────┼────────────────────┐              │
//! │      ▼                    ▼                    ▼              │
//! │  ┌────────┐     ┌──────────────────┐     ┌──────────┐        │
//! │  │  TUN   │     │   iplink-core    │     │  Serial  │        │
//! │  │ device │     │ (KISS + checksum)│     │   port   │        │
//! │  └────────┘     └──────────────────┘     └──────────┘        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! TUN ──► wrap (type + checksum) ──► KISS encode ──► UART
//! UART ──► KISS decode ──► validate ──► dispatch ──► TUN
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Requires root or CAP_NET_ADMIN for the TUN device
//! - The engine is strictly single-threaded; keep it that way
//! - Configuration changes require a restart
//!
//! ## Last Modified
//! v0.1.0 - Initial bridge implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod hexdump;
pub mod liveness;
pub mod meter;
pub mod signals;
pub mod stats;

// Re-export primary types
pub use config::{Config, LinkAddr};
pub use engine::LinkEngine;
pub use error::{LinkError, Result};
