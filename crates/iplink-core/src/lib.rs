// ============================================
// File: crates/iplink-core/src/lib.rs
// ============================================
//! # IpLink Core - Wire Protocol Library
//!
//! ## Creation Reason
//! Provides the wire protocol for the IpLink serial IP bridge: the byte
//! framing codec, the integrity checksum, and the packet layer that ties
//! them together. This crate performs no I/O.
//!
//! ## Main Functionality
//!
//! ### KISS Module ([`kiss`])
//! - Byte-stuffed framing (RFC 1055 SLIP variant)
//! - Streaming decoder with bounded memory and error recovery
//!
//! ### Checksum Module ([`checksum`])
//! - 32-bit non-cryptographic integrity code
//! - Frame-type mixing for the packet trailer
//!
//! ### Packet Module ([`packet`])
//! - Frame-type byte + payload + big-endian checksum trailer
//! - Length- and checksum-validated decoding
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   iplink (binary)                   │
//! │                        │                            │
//! │          ┌─────────────┴─────────────┐              │
//! │          ▼                           ▼              │
//! │    iplink-core  ◄──           iplink-transport      │
//! │    You are here                                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```text
//! ┌──────┬──────────── variable, escaped ───────────┬──────┐
//! │ FEND │ type | payload | BE32(checksum XOR type) │ FEND │
//! └──────┴───────────────────────────────────────────┴──────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The checksum is a wire-compatibility constant; never "fix" it
//! - The decoder must stay bounded: one frame buffer, no queue growth
//! - Everything here must stay synchronous and allocation-light
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checksum;
pub mod error;
pub mod kiss;
pub mod packet;

// Re-export commonly used items
pub use checksum::{calc_checksum, packet_checksum};
pub use error::{CoreError, Result};
pub use kiss::{Decoder, Encoder};
pub use packet::{decode_packet, encode_packet, FrameType, MIN_PACKET_LEN};
