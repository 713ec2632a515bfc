// ============================================
// File: crates/iplink-transport/src/serial/mock.rs
// ============================================
//! # Mock Serial Port
//!
//! ## Creation Reason
//! Provides an in-memory serial byte stream so the link engine can be
//! exercised in tests without hardware or privileges.
//!
//! ## Main Functionality
//! - Injectable receive stream (bytes appear on the next `read`)
//! - Captured transmit stream for verification
//! - Cloneable handle: the test keeps one clone, the engine owns another
//!
//! ## Usage in Tests
//! ```
//! use iplink_transport::serial::MockSerial;
//! use iplink_transport::traits::SerialLink;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let uart = MockSerial::new();
//! uart.inject(b"\xC0\x01\xC0");
//!
//! let mut buf = [0u8; 16];
//! let n = uart.read(&mut buf).await.unwrap();
//! assert_eq!(&buf[..n], b"\xC0\x01\xC0");
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Testing only; never reachable from the binary
//! - `write` optionally truncates to a configured chunk size so short-write
//!   handling can be exercised
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;
use crate::traits::SerialLink;

#[derive(Debug, Default)]
struct Inner {
    /// Bytes waiting to be read by the engine.
    rx: Mutex<VecDeque<u8>>,
    /// Bytes the engine has written.
    tx: Mutex<Vec<u8>>,
    /// Largest write accepted in one call (None = unlimited).
    write_limit: Mutex<Option<usize>>,
    /// Wakes readers when bytes are injected.
    notify: Notify,
}

/// Mock serial port for engine tests.
///
/// Cloning returns a handle to the same stream.
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    inner: Arc<Inner>,
}

impl MockSerial {
    /// Creates a new mock serial port.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects bytes to be returned by subsequent `read` calls.
    pub fn inject(&self, bytes: &[u8]) {
        self.inner.rx.lock().extend(bytes.iter().copied());
        self.inner.notify.notify_one();
    }

    /// Takes everything the engine has written so far.
    #[must_use]
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.tx.lock())
    }

    /// Returns the number of captured output bytes.
    #[must_use]
    pub fn written_len(&self) -> usize {
        self.inner.tx.lock().len()
    }

    /// Caps how many bytes a single `write` call accepts.
    ///
    /// Used to simulate a slow UART producing short writes.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        *self.inner.write_limit.lock() = limit;
    }
}

#[async_trait]
impl SerialLink for MockSerial {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            {
                let mut rx = self.inner.rx.lock();
                if !rx.is_empty() {
                    let n = rx.len().min(buf.len());
                    for (dst, src) in buf.iter_mut().zip(rx.drain(..n)) {
                        *dst = src;
                    }
                    return Ok(n);
                }
            }
            self.inner.notify.notified().await;
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        let limit = self.inner.write_limit.lock().unwrap_or(buf.len());
        let n = buf.len().min(limit);
        self.inner.tx.lock().extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

// ============================================
// Tests
// ============================================
