// ============================================
// File: crates/iplink/src/meter.rs
// ============================================
//! # Throughput Meter
//!
//! ## Creation Reason
//! Gives the operator a live view of link utilization: a half-second tick
//! samples the byte counters and a sliding window turns them into rates.
//!
//! ## Main Functionality
//! - [`Meter`]: sliding window over a monotonically increasing counter
//! - [`LinkMeter`]: the periodic tick plus one meter per direction
//! - [`format_si`]: SI-prefixed human-readable number formatting
//!
//! ## ⚠️ Important Note for Next Developer
//! - Purely cosmetic; nothing in the link protocol depends on this module
//!
//! ## Last Modified
//! v0.1.0 - Initial meter implementation

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Sample window length.
const HISTORY_LEN: usize = 15;

/// Tick period.
const TICK: Duration = Duration::from_millis(500);

// ============================================
// Meter
// ============================================

/// Sliding window over a monotonically increasing counter.
///
/// Samples are pushed at a fixed interval; the rate is the difference
/// between the newest and oldest retained sample divided by the window
/// span.
#[derive(Debug)]
pub struct Meter {
    max_len: usize,
    interval_secs: f64,
    history: VecDeque<u64>,
}

impl Meter {
    /// Creates a meter retaining `max_len` samples taken every
    /// `interval_secs` seconds.
    #[must_use]
    pub fn new(max_len: usize, interval_secs: f64) -> Self {
        Self {
            max_len,
            interval_secs,
            history: VecDeque::with_capacity(max_len),
        }
    }

    /// Records a counter sample.
    pub fn write(&mut self, value: u64) {
        self.history.push_front(value);
        while self.history.len() > self.max_len {
            self.history.pop_back();
        }
    }

    /// Returns the number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns whether no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Returns the rate over the retained window, in counter units per
    /// second. Needs at least two samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        let span = self.history.len() - 1;
        let newest = self.history.front().copied().unwrap_or(0);
        let oldest = self.history.back().copied().unwrap_or(0);
        let diff = newest.saturating_sub(oldest);
        diff as f64 / (self.interval_secs * span as f64)
    }

    /// Discards all samples.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

// ============================================
// LinkMeter
// ============================================

/// The engine-side meter: periodic tick plus one [`Meter`] per direction.
#[derive(Debug)]
pub struct LinkMeter {
    /// Tick source; fires immediately, then every half second.
    pub interval: Interval,
    /// Window over `uart_rx_bytes`.
    pub rx: Meter,
    /// Window over `uart_tx_bytes`.
    pub tx: Meter,
}

impl LinkMeter {
    /// Creates a meter. Must be called within a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let mut tick = interval(TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: tick,
            rx: Meter::new(HISTORY_LEN, TICK.as_secs_f64()),
            tx: Meter::new(HISTORY_LEN, TICK.as_secs_f64()),
        }
    }
}

// ============================================
// SI formatting
// ============================================

/// Formats a value with an SI prefix and `digits` significant digits.
///
/// # Example
/// ```
/// use iplink::meter::format_si;
///
/// assert_eq!(format_si(1234.0, "B/s", 3), "1.23kB/s");
/// assert_eq!(format_si(0.0, "B", 3), "0.00B");
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub fn format_si(value: f64, base_unit: &str, digits: i32) -> String {
    const PREFIXES: [char; 17] = [
        'y', 'z', 'a', 'f', 'p', 'n', 'u', 'm', ' ', 'k', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y',
    ];

    let l1000 = if value == 0.0 {
        0
    } else {
        (value.abs().log10() / 3.0).floor() as i32
    };
    let iprefix = (l1000 + 8).clamp(0, PREFIXES.len() as i32 - 1);
    let scaled = value * 1000f64.powi(8 - iprefix);
    let prefix = PREFIXES[iprefix as usize];

    let text = if scaled.abs() < 1.0 && scaled != 0.0 {
        let prec = digits as usize;
        format!("{scaled:.prec$e}")
    } else {
        let magnitude = if scaled == 0.0 {
            0
        } else {
            scaled.abs().log10().floor() as i32
        };
        let places = (digits - magnitude - 1).max(0) as usize;
        format!("{scaled:.places$}")
    };

    if prefix == ' ' {
        format!("{text}{base_unit}")
    } else {
        format!("{text}{prefix}{base_unit}")
    }
}

// ============================================
// Tests
// ============================================
