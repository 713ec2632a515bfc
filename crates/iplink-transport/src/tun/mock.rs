// ============================================
// File: crates/iplink-transport/src/tun/mock.rs
// ============================================
//! # Mock TUN Device Implementation
//!
//! ## Creation Reason
//! Provides a mock TUN device for testing the link engine without device
//! creation or root privileges.
//!
//! ## Main Functionality
//! - In-memory datagram queues
//! - Up/down transition log for asserting link-state side effects
//! - Cloneable handle: the test keeps one clone, the engine owns another
//!
//! ## Usage in Tests
//! ```
//! use iplink_transport::tun::MockTun;
//! use iplink_transport::traits::TunInterface;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tun = MockTun::new("mock0", 1500);
//!
//! // Inject a datagram to be read
//! tun.inject_frame(vec![0, 0, 8, 0, 0x45]);
//!
//! let mut buf = [0u8; 1500];
//! let len = tun.recv(&mut buf).await.unwrap();
//! assert_eq!(&buf[..len], &[0, 0, 8, 0, 0x45]);
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Testing only; never reachable from the binary
//! - `writable` always resolves immediately, like a real TUN device in
//!   practice
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;
use crate::traits::TunInterface;

#[derive(Debug)]
struct Inner {
    name: String,
    mtu: u16,
    /// Datagrams waiting to be read by the engine.
    read_queue: Mutex<VecDeque<Vec<u8>>>,
    /// Datagrams the engine has sent.
    sent: Mutex<Vec<Vec<u8>>>,
    /// Current link state.
    up: AtomicBool,
    /// Every `set_up` call, in order.
    up_history: Mutex<Vec<bool>>,
    /// Wakes readers when a datagram is injected.
    notify: Notify,
}

/// Mock TUN device for engine tests.
///
/// Cloning returns a handle to the same device.
#[derive(Debug, Clone)]
pub struct MockTun {
    inner: Arc<Inner>,
}

impl MockTun {
    /// Creates a new mock TUN device.
    #[must_use]
    pub fn new(name: impl Into<String>, mtu: u16) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                mtu,
                read_queue: Mutex::new(VecDeque::new()),
                sent: Mutex::new(Vec::new()),
                up: AtomicBool::new(false),
                up_history: Mutex::new(Vec::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Injects a datagram to be returned by the next `recv` call.
    pub fn inject_frame(&self, frame: Vec<u8>) {
        self.inner.read_queue.lock().push_back(frame);
        self.inner.notify.notify_one();
    }

    /// Takes all datagrams the engine has sent so far.
    #[must_use]
    pub fn take_sent_frames(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.inner.sent.lock())
    }

    /// Returns the current link state.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.inner.up.load(Ordering::Acquire)
    }

    /// Returns every `set_up` transition requested so far, in order.
    #[must_use]
    pub fn up_history(&self) -> Vec<bool> {
        self.inner.up_history.lock().clone()
    }

    /// Returns the number of datagrams waiting to be read.
    #[must_use]
    pub fn pending_read_count(&self) -> usize {
        self.inner.read_queue.lock().len()
    }
}

#[async_trait]
impl TunInterface for MockTun {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            {
                let mut queue = self.inner.read_queue.lock();
                if let Some(frame) = queue.pop_front() {
                    let n = frame.len().min(buf.len());
                    buf[..n].copy_from_slice(&frame[..n]);
                    return Ok(n);
                }
            }
            self.inner.notify.notified().await;
        }
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.inner.sent.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    async fn writable(&self) -> Result<()> {
        Ok(())
    }

    async fn set_up(&self, up: bool) -> Result<()> {
        self.inner.up.store(up, Ordering::Release);
        self.inner.up_history.lock().push(up);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn mtu(&self) -> u16 {
        self.inner.mtu
    }
}

// ============================================
// Tests
// ============================================
