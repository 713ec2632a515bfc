// ============================================
// File: crates/iplink/src/engine.rs
// ============================================
//! # Link Engine
//!
//! ## Creation Reason
//! The reactor at the heart of the bridge: pumps bytes between the serial
//! line and the TUN device, schedules keep-alives, tracks peer liveness,
//! and (optionally) follows the peer with TUN up/down transitions.
//!
//! ## Main Functionality
//! - Single-task event loop over serial, TUN, signals, and timers
//! - Conditional readiness: each I/O branch is armed only when the engine
//!   has somewhere to put the result
//! - Packet encode/decode through the KISS codec and checksum layer
//! - Peer-liveness edges with exactly-once side effects
//!
//! ## Backpressure Model
//! ```text
//!   TUN read  ──► uart_tx_bytes ──► serial write
//!   serial read ──► uart_rx_frames ──► TUN write
//!
//!   serial read enabled  ⇔ uart_rx_frames empty
//!   serial write enabled ⇔ uart_tx_bytes non-empty
//!   TUN read enabled     ⇔ tun up ∧ uart_tx_bytes empty
//!   TUN write enabled    ⇔ tun up ∧ uart_rx_frames non-empty
//! ```
//! The cross-coupling bounds peak memory to one in-flight datagram per
//! direction plus the decoder's frame buffer.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The loop is strictly single-threaded; handlers run to completion and
//!   the readiness conditions are recomputed before every `select!`
//! - ANY inbound serial byte counts as proof of peer liveness, not just
//!   complete keep-alive frames
//! - Short serial writes are normal; only the written prefix leaves the
//!   transmit queue
//!
//! ## Last Modified
//! v0.1.0 - Initial engine implementation

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use iplink_core::kiss::{Decoder, Encoder};
use iplink_core::packet::{decode_packet, encode_packet, FrameType};
use iplink_transport::traits::{SerialLink, TunInterface};

use crate::config::Config;
use crate::error::Result;
use crate::hexdump::hexdump_lines;
use crate::liveness::{Liveness, PeerEdge};
use crate::meter::{format_si, LinkMeter};
use crate::signals::{LinkSignal, Signals};
use crate::stats::Stats;

/// Serial transfer block size.
const IO_BLOCK: usize = 64 * 1024;

/// Length of the kernel packet-info prefix on every TUN datagram.
const TUN_PI_LEN: usize = 4;

/// Minimum length of an IPv4 header.
const MIN_IPV4_HEADER: usize = 20;

// ============================================
// Readiness
// ============================================

/// Which I/O branches the engine currently wants armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Readiness {
    uart_in: bool,
    uart_out: bool,
    tun_in: bool,
    tun_out: bool,
}

/// Returns the contiguous head of the transmit queue, capped to one block.
fn tx_head(queue: &VecDeque<u8>) -> &[u8] {
    let (head, _) = queue.as_slices();
    &head[..head.len().min(IO_BLOCK)]
}

/// Resolves when the meter ticks; never, when metering is off.
async fn meter_tick(meter: &mut Option<LinkMeter>) {
    match meter.as_mut() {
        Some(m) => {
            m.interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ============================================
// LinkEngine
// ============================================

/// The bridge reactor.
///
/// Owns both devices, the signal source, the keep-alive deadlines, and the
/// two relay queues for its entire lifetime. Generic over the device traits
/// so tests can drive it with in-memory mocks.
///
/// # Lifecycle
/// 1. Create with [`LinkEngine::new`]
/// 2. Run with [`LinkEngine::run`] until a termination signal
/// 3. On exit the TUN interface is set down
pub struct LinkEngine<U, T> {
    config: Config,

    // Declared in reverse order of acquisition so the TUN interface is
    // released (and set down by its Drop) before the serial line closes.
    tun: T,
    uart: U,
    signals: Signals,

    encoder: Encoder,
    decoder: Decoder,
    liveness: Liveness,
    stats: Stats,
    meter: Option<LinkMeter>,

    terminating: bool,
    tun_up: bool,

    /// Decoded inbound frames awaiting validation and TUN delivery.
    uart_rx_frames: VecDeque<Vec<u8>>,
    /// Encoded outbound bytes awaiting the serial line.
    uart_tx_bytes: VecDeque<u8>,

    send_ka_at: Instant,
    recv_ka_at: Instant,
}

impl<U, T> LinkEngine<U, T>
where
    U: SerialLink,
    T: TunInterface,
{
    /// Creates an engine over an opened serial link and TUN device.
    ///
    /// The configuration must already be validated.
    #[must_use]
    pub fn new(config: Config, uart: U, tun: T, signals: Signals) -> Self {
        let max_frame_len = TUN_PI_LEN + usize::from(config.mtu);
        let now = Instant::now();
        Self {
            uart,
            tun,
            signals,
            encoder: Encoder::new(),
            decoder: Decoder::new(max_frame_len),
            liveness: Liveness::new(config.keepalive_limit),
            stats: Stats::new(),
            meter: None,
            terminating: false,
            tun_up: false,
            uart_rx_frames: VecDeque::new(),
            uart_tx_bytes: VecDeque::new(),
            send_ka_at: now,
            recv_ka_at: now,
            config,
        }
    }

    /// Runs the bridge until a termination signal arrives.
    ///
    /// # Errors
    /// Returns error on a device I/O failure. Wire-level errors (bad
    /// checksum, short frames) are counted and recovered internally.
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.updown {
            self.set_tun_updown(true).await?;
        }
        if self.config.meter {
            self.meter = Some(LinkMeter::new());
        }
        self.reset_send_ka();
        self.reset_recv_ka();
        // Announce ourselves so the peer notices us without waiting a
        // full interval.
        self.send_keepalive();

        let mut serial_buf = vec![0u8; IO_BLOCK];
        let mut tun_buf = vec![0u8; TUN_PI_LEN + usize::from(self.config.mtu)];

        while !self.terminating {
            let keepalive = self.config.keepalive_interval > 0;
            let metering = self.meter.is_some();
            let ready = self.readiness();

            tokio::select! {
                signal = self.signals.recv() => self.on_signal(signal),
                () = sleep_until(self.send_ka_at), if keepalive => self.on_send_ka_timer(),
                () = sleep_until(self.recv_ka_at), if keepalive => self.on_recv_ka_timer().await?,
                () = meter_tick(&mut self.meter), if metering => self.on_meter_tick(),
                result = self.uart.read(&mut serial_buf), if ready.uart_in => {
                    let n = result?;
                    self.on_serial_readable(&serial_buf[..n]).await?;
                }
                result = self.uart.write(tx_head(&self.uart_tx_bytes)), if ready.uart_out => {
                    self.on_serial_writable(result?);
                }
                result = self.tun.recv(&mut tun_buf), if ready.tun_in => {
                    let n = result?;
                    self.on_tun_readable(&tun_buf[..n]);
                }
                result = self.tun.writable(), if ready.tun_out => {
                    result?;
                    self.on_tun_writable().await?;
                }
            }
        }

        if self.meter.is_some() {
            eprintln!();
        }
        self.set_tun_updown(false).await?;
        Ok(())
    }

    // ========================================
    // Readiness
    // ========================================

    /// Computes which I/O branches should be armed for the next iteration.
    ///
    /// The engine reads from a source only when it has somewhere to put the
    /// result, which bounds memory without any explicit flow control.
    fn readiness(&self) -> Readiness {
        Readiness {
            uart_in: self.uart_rx_frames.is_empty(),
            uart_out: !self.uart_tx_bytes.is_empty(),
            tun_in: self.tun_up && self.uart_tx_bytes.is_empty(),
            tun_out: self.tun_up && !self.uart_rx_frames.is_empty(),
        }
    }

    // ========================================
    // Handlers
    // ========================================

    fn on_signal(&mut self, signal: LinkSignal) {
        match signal {
            LinkSignal::Terminate => self.terminating = true,
            LinkSignal::DumpStats => print!("{}", self.stats),
        }
    }

    fn on_send_ka_timer(&mut self) {
        self.send_keepalive();
    }

    async fn on_recv_ka_timer(&mut self) -> Result<()> {
        let edge = self.liveness.on_missed();
        self.apply_peer_edge(edge).await?;
        self.reset_recv_ka();
        Ok(())
    }

    fn on_meter_tick(&mut self) {
        let Some(meter) = self.meter.as_mut() else {
            return;
        };
        meter.rx.write(self.stats.uart_rx_bytes);
        meter.tx.write(self.stats.uart_tx_bytes);
        if meter.rx.len() < 2 || meter.tx.len() < 2 {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            eprint!(
                "\r\x1b[K  [rx:{} @ {}]  [tx:{} @ {}]",
                format_si(self.stats.uart_rx_bytes as f64, "B", 3),
                format_si(meter.rx.rate(), "B/s", 3),
                format_si(self.stats.uart_tx_bytes as f64, "B", 3),
                format_si(meter.tx.rate(), "B/s", 3),
            );
        }
    }

    /// Handles inbound serial bytes: count, decode, and credit liveness.
    async fn on_serial_readable(&mut self, bytes: &[u8]) -> Result<()> {
        self.stats.uart_rx_bytes += bytes.len() as u64;
        self.uart_rx_frames.extend(self.decoder.decode(bytes));
        if !bytes.is_empty() {
            // Any serial activity is evidence the peer is alive.
            self.on_received_keepalive().await?;
        }
        Ok(())
    }

    /// Handles a completed serial write: only the accepted prefix leaves
    /// the queue.
    fn on_serial_writable(&mut self, sent: usize) {
        self.uart_tx_bytes.drain(..sent);
        self.stats.uart_tx_bytes += sent as u64;
        if sent > 0 {
            // Anything we sent refreshes the peer's view of us.
            self.on_sent_keepalive();
        }
    }

    /// Handles one datagram read from the TUN device.
    fn on_tun_readable(&mut self, datagram: &[u8]) {
        let ip_len = datagram.len().saturating_sub(TUN_PI_LEN) as u64;
        if self.tun_up {
            self.stats.tun_rx_frames += 1;
            self.stats.tun_rx_bytes += ip_len;
            self.write_packet(FrameType::IpPacket, datagram);
            self.verbose_hexdump("TUN ==> UART", datagram);
        } else {
            self.stats.tun_rx_ignored_frames += 1;
            self.stats.tun_rx_ignored_bytes += ip_len;
        }
    }

    /// Pops one received frame, validates it, and dispatches on its type.
    ///
    /// The packet layer hands back the raw type byte; frames of a type this
    /// engine does not speak are dropped here, not in the decoder.
    async fn on_tun_writable(&mut self) -> Result<()> {
        let Some(frame) = self.uart_rx_frames.pop_front() else {
            return Ok(());
        };
        let (type_byte, payload) = match decode_packet(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.uart_rx_errors += 1;
                debug!("Dropping inbound frame: {}", e);
                self.verbose_hexdump("UART =!> TUN [invalid]", &frame);
                return Ok(());
            }
        };
        match FrameType::from_byte(type_byte) {
            Some(FrameType::Keepalive) => {
                self.on_received_keepalive().await?;
            }
            Some(FrameType::IpPacket) => {
                if payload.len() < TUN_PI_LEN + MIN_IPV4_HEADER {
                    self.stats.uart_rx_errors += 1;
                    debug!("Dropping short IP packet: {} bytes", payload.len());
                    self.verbose_hexdump("UART =!> TUN [short IP packet]", payload);
                    return Ok(());
                }
                self.on_received_keepalive().await?;
                self.tun.send(payload).await?;
                self.stats.tun_tx_frames += 1;
                self.stats.tun_tx_bytes += (payload.len() - TUN_PI_LEN) as u64;
                self.verbose_hexdump("UART ==> TUN", payload);
            }
            None => {
                self.stats.uart_rx_errors += 1;
                debug!("Dropping frame with unknown type {:#04x}", type_byte);
                self.verbose_hexdump("UART =!> TUN [invalid type]", payload);
            }
        }
        Ok(())
    }

    // ========================================
    // Keep-alives
    // ========================================

    /// Enqueues a keep-alive packet and re-arms the send deadline.
    ///
    /// The payload is the frame-type byte itself, so even keep-alives
    /// exercise the checksum path.
    fn send_keepalive(&mut self) {
        self.write_packet(FrameType::Keepalive, &[FrameType::Keepalive.as_byte()]);
        self.on_sent_keepalive();
    }

    fn on_sent_keepalive(&mut self) {
        self.reset_send_ka();
    }

    async fn on_received_keepalive(&mut self) -> Result<()> {
        let edge = self.liveness.on_activity();
        self.apply_peer_edge(edge).await?;
        self.reset_recv_ka();
        Ok(())
    }

    fn reset_send_ka(&mut self) {
        if self.config.keepalive_interval == 0 {
            return;
        }
        self.send_ka_at = Instant::now() + Duration::from_millis(self.config.keepalive_interval);
    }

    fn reset_recv_ka(&mut self) {
        if self.config.keepalive_interval == 0 {
            return;
        }
        self.recv_ka_at = Instant::now() + Duration::from_millis(self.config.keepalive_interval);
    }

    // ========================================
    // Peer state
    // ========================================

    /// Applies a liveness edge; side effects fire exactly once per edge.
    async fn apply_peer_edge(&mut self, edge: Option<PeerEdge>) -> Result<()> {
        match edge {
            None => {}
            Some(PeerEdge::Connected) => {
                info!("[peer connected]");
                if self.config.updown {
                    self.set_tun_updown(true).await?;
                }
            }
            Some(PeerEdge::Disconnected) => {
                info!("[peer disconnected]");
                // Stale bytes must not be delivered to a peer that
                // reconnects later.
                self.uart_rx_frames.clear();
                self.uart_tx_bytes.clear();
                if self.config.updown {
                    self.set_tun_updown(false).await?;
                }
            }
        }
        Ok(())
    }

    /// Brings the TUN interface up or down; a no-op if already there.
    async fn set_tun_updown(&mut self, up: bool) -> Result<()> {
        if up == self.tun_up {
            return Ok(());
        }
        self.tun.set_up(up).await?;
        if up {
            info!("[tun up]");
        } else {
            info!("[tun down]");
        }
        self.tun_up = up;
        Ok(())
    }

    // ========================================
    // Packet I/O
    // ========================================

    /// Wraps a payload in a packet and streams it, framed, onto the
    /// transmit queue.
    fn write_packet(&mut self, frame_type: FrameType, payload: &[u8]) {
        let raw = encode_packet(frame_type, payload);
        self.encoder.encode_into(&raw, &mut self.uart_tx_bytes);
    }

    fn verbose_hexdump(&self, title: &str, buf: &[u8]) {
        if !self.config.verbose {
            return;
        }
        debug!("{} ({} bytes)", title, buf.len());
        for line in hexdump_lines(buf) {
            debug!("{}", line);
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use iplink_core::checksum::packet_checksum;
    use iplink_transport::serial::MockSerial;
    use iplink_transport::tun::MockTun;

    /// The startup keep-alive as it appears on the wire.
    const KEEPALIVE_WIRE: [u8; 8] = [0xC0, 0x01, 0x01, 0x55, 0x55, 0x55, 0x2F, 0xC0];

    fn test_config() -> Config {
        Config {
            mtu: 1500,
            keepalive_interval: 100,
            keepalive_limit: 3,
            ..Config::default()
        }
    }

    fn build(config: Config) -> (LinkEngine<MockSerial, MockTun>, MockSerial, MockTun) {
        let uart = MockSerial::new();
        let tun = MockTun::new("mock0", config.mtu);
        let signals = Signals::new().unwrap();
        let engine = LinkEngine::new(config, uart.clone(), tun.clone(), signals);
        (engine, uart, tun)
    }

    /// A minimal valid IP-packet payload: packet-info prefix plus a bare
    /// IPv4 header.
    fn ip_payload() -> Vec<u8> {
        let mut payload = vec![0x00, 0x00, 0x08, 0x00];
        payload.push(0x45);
        payload.extend_from_slice(&[0u8; MIN_IPV4_HEADER - 1]);
        payload
    }

    #[tokio::test]
    async fn test_keepalive_wire_format() {
        let (mut engine, _uart, _tun) = build(test_config());
        engine.send_keepalive();
        let wire: Vec<u8> = engine.uart_tx_bytes.iter().copied().collect();
        assert_eq!(wire, KEEPALIVE_WIRE);
    }

    #[tokio::test]
    async fn test_readiness_tracks_queues_and_link() {
        let (mut engine, _uart, _tun) = build(test_config());

        // Fresh engine: only serial input is armed.
        let ready = engine.readiness();
        assert!(ready.uart_in && !ready.uart_out && !ready.tun_in && !ready.tun_out);

        // Link up: TUN input opens too.
        engine.set_tun_updown(true).await.unwrap();
        let ready = engine.readiness();
        assert!(ready.uart_in && !ready.uart_out && ready.tun_in && !ready.tun_out);

        // Pending transmit bytes: serial output opens, TUN input closes.
        engine.send_keepalive();
        let ready = engine.readiness();
        assert!(ready.uart_in && ready.uart_out && !ready.tun_in && !ready.tun_out);

        // Pending received frame: serial input closes, TUN output opens.
        engine.uart_tx_bytes.clear();
        engine.uart_rx_frames.push_back(vec![0x01]);
        let ready = engine.readiness();
        assert!(!ready.uart_in && !ready.uart_out && ready.tun_in && ready.tun_out);

        // Link down gates both TUN branches regardless of queue state.
        engine.set_tun_updown(false).await.unwrap();
        let ready = engine.readiness();
        assert!(!ready.tun_in && !ready.tun_out);
    }

    #[tokio::test]
    async fn test_serial_activity_connects_peer() {
        let config = Config {
            updown: true,
            ..test_config()
        };
        let (mut engine, _uart, tun) = build(config);

        // Raw noise is enough; no complete frame is required.
        engine.on_serial_readable(&[0xFF]).await.unwrap();

        assert!(engine.liveness.is_connected());
        assert!(engine.tun_up);
        assert_eq!(tun.up_history(), [true]);
        assert_eq!(engine.stats.uart_rx_bytes, 1);
    }

    #[tokio::test]
    async fn test_serial_readable_queues_frames() {
        let (mut engine, _uart, _tun) = build(test_config());

        // Wire keep-alive split across two reads.
        engine.on_serial_readable(&KEEPALIVE_WIRE[..3]).await.unwrap();
        assert!(engine.uart_rx_frames.is_empty());
        engine.on_serial_readable(&KEEPALIVE_WIRE[3..]).await.unwrap();

        assert_eq!(engine.uart_rx_frames.len(), 1);
        assert_eq!(engine.uart_rx_frames[0], &KEEPALIVE_WIRE[1..7]);
        assert_eq!(engine.stats.uart_rx_bytes, 8);
    }

    #[tokio::test]
    async fn test_tun_writable_consumes_keepalive() {
        let (mut engine, _uart, tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        engine.uart_rx_frames.push_back(KEEPALIVE_WIRE[1..7].to_vec());
        engine.on_tun_writable().await.unwrap();

        assert!(engine.uart_rx_frames.is_empty());
        assert!(tun.take_sent_frames().is_empty());
        assert!(engine.liveness.is_connected());
        assert_eq!(engine.stats.uart_rx_errors, 0);
    }

    #[tokio::test]
    async fn test_tun_writable_forwards_ip_packet() {
        let (mut engine, _uart, tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        let payload = ip_payload();
        let raw = encode_packet(FrameType::IpPacket, &payload);
        engine.uart_rx_frames.push_back(raw.to_vec());
        engine.on_tun_writable().await.unwrap();

        assert_eq!(tun.take_sent_frames(), vec![payload.clone()]);
        assert_eq!(engine.stats.tun_tx_frames, 1);
        assert_eq!(engine.stats.tun_tx_bytes, (payload.len() - TUN_PI_LEN) as u64);
        assert!(engine.liveness.is_connected());
    }

    #[tokio::test]
    async fn test_tun_writable_drops_short_ip_packet() {
        let (mut engine, _uart, tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        // Packet-info prefix plus ten bytes: too short for an IPv4 header.
        let payload = vec![0u8; TUN_PI_LEN + 10];
        let raw = encode_packet(FrameType::IpPacket, &payload);
        engine.uart_rx_frames.push_back(raw.to_vec());
        engine.on_tun_writable().await.unwrap();

        assert!(tun.take_sent_frames().is_empty());
        assert_eq!(engine.stats.uart_rx_errors, 1);
        assert_eq!(engine.stats.tun_tx_frames, 0);
    }

    #[tokio::test]
    async fn test_tun_writable_drops_corrupted_frame() {
        let (mut engine, _uart, tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        let mut raw = encode_packet(FrameType::IpPacket, &ip_payload()).to_vec();
        raw[6] ^= 0x01;
        engine.uart_rx_frames.push_back(raw);
        engine.on_tun_writable().await.unwrap();

        assert!(tun.take_sent_frames().is_empty());
        assert_eq!(engine.stats.uart_rx_errors, 1);
        // A corrupted frame is not evidence of a live peer.
        assert!(!engine.liveness.is_connected());
    }

    #[tokio::test]
    async fn test_tun_writable_drops_unknown_frame_type() {
        let (mut engine, _uart, tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        // Valid checksum, unassigned type byte.
        let mut raw = vec![0x7F];
        raw.extend_from_slice(b"???");
        raw.extend_from_slice(&packet_checksum(0x7F, b"???").to_be_bytes());
        engine.uart_rx_frames.push_back(raw);
        engine.on_tun_writable().await.unwrap();

        assert!(tun.take_sent_frames().is_empty());
        assert_eq!(engine.stats.uart_rx_errors, 1);
    }

    #[tokio::test]
    async fn test_tun_readable_wraps_datagram() {
        let (mut engine, _uart, _tun) = build(test_config());
        engine.set_tun_updown(true).await.unwrap();

        let datagram = ip_payload();
        engine.on_tun_readable(&datagram);

        // The transmit queue holds exactly one framed packet that decodes
        // back to the datagram.
        let wire: Vec<u8> = engine.uart_tx_bytes.iter().copied().collect();
        let mut decoder = Decoder::new(4096);
        let frames = decoder.decode(&wire);
        assert_eq!(frames.len(), 1);
        let (type_byte, payload) = decode_packet(&frames[0]).unwrap();
        assert_eq!(type_byte, FrameType::IpPacket.as_byte());
        assert_eq!(payload, datagram);
        assert_eq!(engine.stats.tun_rx_frames, 1);
        assert_eq!(engine.stats.tun_rx_bytes, (datagram.len() - TUN_PI_LEN) as u64);
    }

    #[tokio::test]
    async fn test_tun_readable_ignored_while_down() {
        let (mut engine, _uart, _tun) = build(test_config());

        engine.on_tun_readable(&ip_payload());

        assert!(engine.uart_tx_bytes.is_empty());
        assert_eq!(engine.stats.tun_rx_frames, 0);
        assert_eq!(engine.stats.tun_rx_ignored_frames, 1);
        assert_eq!(
            engine.stats.tun_rx_ignored_bytes,
            (ip_payload().len() - TUN_PI_LEN) as u64
        );
    }

    #[tokio::test]
    async fn test_short_write_erases_only_sent_prefix() {
        let (mut engine, _uart, _tun) = build(test_config());
        engine.send_keepalive();
        let before: Vec<u8> = engine.uart_tx_bytes.iter().copied().collect();

        engine.on_serial_writable(3);

        let after: Vec<u8> = engine.uart_tx_bytes.iter().copied().collect();
        assert_eq!(after, before[3..]);
        assert_eq!(engine.stats.uart_tx_bytes, 3);
    }

    #[tokio::test]
    async fn test_sent_bytes_rearm_send_deadline() {
        let (mut engine, _uart, _tun) = build(test_config());
        engine.send_keepalive();
        engine.send_ka_at = Instant::now() - Duration::from_secs(1);

        engine.on_serial_writable(1);
        assert!(engine.send_ka_at > Instant::now());

        // A zero-byte write must not refresh the deadline.
        engine.send_ka_at = Instant::now() - Duration::from_secs(1);
        engine.on_serial_writable(0);
        assert!(engine.send_ka_at < Instant::now());
    }

    #[tokio::test]
    async fn test_keepalive_timeout_declares_disconnect_once() {
        let config = Config {
            updown: true,
            ..test_config()
        };
        let (mut engine, _uart, tun) = build(config);

        engine.on_serial_readable(&KEEPALIVE_WIRE).await.unwrap();
        assert!(engine.tun_up);

        // Three silent intervals take the peer down, exactly once.
        engine.on_recv_ka_timer().await.unwrap();
        engine.on_recv_ka_timer().await.unwrap();
        assert!(engine.tun_up);
        engine.on_recv_ka_timer().await.unwrap();
        assert!(!engine.tun_up);
        assert!(!engine.liveness.is_connected());

        // Further expirations change nothing.
        engine.on_recv_ka_timer().await.unwrap();
        engine.on_recv_ka_timer().await.unwrap();
        assert_eq!(tun.up_history(), [true, false]);
    }

    #[tokio::test]
    async fn test_disconnect_flushes_both_queues() {
        let config = Config {
            updown: true,
            ..test_config()
        };
        let (mut engine, _uart, _tun) = build(config);

        engine.on_serial_readable(&KEEPALIVE_WIRE).await.unwrap();
        engine.send_keepalive();
        assert!(!engine.uart_tx_bytes.is_empty());
        assert!(!engine.uart_rx_frames.is_empty());

        for _ in 0..3 {
            engine.on_recv_ka_timer().await.unwrap();
        }

        assert!(engine.uart_tx_bytes.is_empty());
        assert!(engine.uart_rx_frames.is_empty());
    }

    #[tokio::test]
    async fn test_no_disconnect_edge_before_first_contact() {
        let config = Config {
            updown: true,
            ..test_config()
        };
        let (mut engine, _uart, tun) = build(config);

        for _ in 0..10 {
            engine.on_recv_ka_timer().await.unwrap();
        }

        // The peer never showed up, so nothing ever toggled.
        assert!(tun.up_history().is_empty());
        assert!(!engine.liveness.is_connected());
    }

    #[tokio::test]
    async fn test_tun_updown_is_idempotent() {
        let (mut engine, _uart, tun) = build(test_config());

        engine.set_tun_updown(true).await.unwrap();
        engine.set_tun_updown(true).await.unwrap();
        engine.set_tun_updown(false).await.unwrap();
        engine.set_tun_updown(false).await.unwrap();

        assert_eq!(tun.up_history(), [true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_periodic_keepalives() {
        let (mut engine, uart, _tun) = build(test_config());
        let run = async move { engine.run().await };
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => panic!("engine exited early: {result:?}"),
            () = tokio::time::sleep(Duration::from_millis(250)) => {}
        }

        // Startup keep-alive plus two timer-driven ones (100 ms interval).
        let written = uart.take_written();
        assert_eq!(written.len() % KEEPALIVE_WIRE.len(), 0);
        assert!(written.len() >= 3 * KEEPALIVE_WIRE.len(), "wrote {} bytes", written.len());
        assert_eq!(written[..8], KEEPALIVE_WIRE[..]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_updown_follows_peer() {
        let config = Config {
            updown: true,
            ..test_config()
        };
        let (mut engine, uart, tun) = build(config);
        let run = async move { engine.run().await };
        tokio::pin!(run);

        // Drives the engine for a stretch of (paused) time.
        macro_rules! step {
            ($millis:expr) => {
                tokio::select! {
                    result = &mut run => panic!("engine exited early: {result:?}"),
                    () = tokio::time::sleep(Duration::from_millis($millis)) => {}
                }
            };
        }

        // The peer is silent: the interface stays down.
        step!(50);
        assert!(!tun.is_up());

        // One valid keep-alive brings the link up.
        uart.inject(&KEEPALIVE_WIRE);
        step!(50);
        assert!(tun.is_up());

        // Three silent intervals take it back down.
        step!(400);
        assert!(!tun.is_up());
        assert_eq!(tun.up_history(), [true, false]);
    }
}
