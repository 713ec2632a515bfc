// ============================================
// File: crates/iplink/src/signals.rs
// ============================================
//! # Signal Handling
//!
//! ## Creation Reason
//! Folds the process signals the bridge cares about into one async source
//! the engine can select on alongside its descriptors.
//!
//! ## Signal Map
//! | Signal | Action |
//! |---|---|
//! | SIGINT, SIGTERM, SIGQUIT | clean shutdown |
//! | SIGUSR1 | dump statistics |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers are installed once at startup via the tokio signal driver;
//!   delivery reaches the engine only through [`Signals::recv`], never
//!   through ad-hoc handlers
//!
//! ## Last Modified
//! v0.1.0 - Initial signal handling

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// An engine-relevant signal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// Shut the bridge down cleanly.
    Terminate,
    /// Print the traffic counters.
    DumpStats,
}

/// The bridge's signal source.
pub struct Signals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
    usr1: Signal,
}

impl Signals {
    /// Installs handlers for the bridge's signal set.
    ///
    /// # Errors
    /// Returns error if a handler cannot be registered.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
            usr1: signal(SignalKind::user_defined1())?,
        })
    }

    /// Waits for the next relevant signal.
    ///
    /// A closed signal stream (only possible during shutdown teardown) is
    /// treated as a termination request.
    pub async fn recv(&mut self) -> LinkSignal {
        tokio::select! {
            _ = self.interrupt.recv() => LinkSignal::Terminate,
            _ = self.terminate.recv() => LinkSignal::Terminate,
            _ = self.quit.recv() => LinkSignal::Terminate,
            _ = self.usr1.recv() => LinkSignal::DumpStats,
        }
    }
}

impl std::fmt::Debug for Signals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signals").finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
