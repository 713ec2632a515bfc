// ============================================
// File: crates/iplink-transport/src/serial/posix.rs
// ============================================
//! # POSIX Serial Port
//!
//! ## Creation Reason
//! Provides the raw serial character device the link engine pumps bytes
//! through: open, termios raw-mode configuration, and non-blocking
//! read/write via the tokio reactor.
//!
//! ## Main Functionality
//! - Open with `O_NOCTTY | O_NONBLOCK | O_CLOEXEC`
//! - Raw mode (`cfmakeraw`), one stop bit, no hardware flow control
//! - Baud configuration from the standard POSIX rate table
//! - Async read/write via `AsyncFd`
//!
//! ## ⚠️ Important Note for Next Developer
//! - The input and output buffers are flushed on open; stale bytes from a
//!   previous run would otherwise confuse the frame decoder
//! - Only the rates in the POSIX table are accepted; arbitrary rates need
//!   termios2, which this link does not use
//!
//! ## Last Modified
//! v0.1.0 - Initial serial implementation

#![cfg(target_os = "linux")]

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use async_trait::async_trait;
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg};
use tokio::io::unix::AsyncFd;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// Maps a numeric rate to its POSIX baud constant.
fn baud_constant(baud: u32) -> Result<BaudRate> {
    let rate = match baud {
        50 => BaudRate::B50,
        75 => BaudRate::B75,
        110 => BaudRate::B110,
        134 => BaudRate::B134,
        150 => BaudRate::B150,
        200 => BaudRate::B200,
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        460_800 => BaudRate::B460800,
        500_000 => BaudRate::B500000,
        921_600 => BaudRate::B921600,
        1_000_000 => BaudRate::B1000000,
        1_152_000 => BaudRate::B1152000,
        1_500_000 => BaudRate::B1500000,
        2_000_000 => BaudRate::B2000000,
        2_500_000 => BaudRate::B2500000,
        3_000_000 => BaudRate::B3000000,
        3_500_000 => BaudRate::B3500000,
        4_000_000 => BaudRate::B4000000,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(rate)
}

// ============================================
// SerialPort
// ============================================

/// A raw-mode POSIX serial port.
///
/// # Example
/// ```ignore
/// use iplink_transport::serial::SerialPort;
///
/// let uart = SerialPort::open("/dev/ttyS0", 115_200)?;
/// let mut buf = [0u8; 4096];
/// let n = uart.read(&mut buf).await?;
/// ```
pub struct SerialPort {
    /// Async descriptor wrapper.
    fd: AsyncFd<File>,
    /// Device path, kept for error context.
    path: String,
}

impl SerialPort {
    /// Opens and configures a serial device.
    ///
    /// # Arguments
    /// * `path` - Device path (e.g. `/dev/ttyS0`)
    /// * `baud` - Line rate; must be in the POSIX rate table
    ///
    /// # Errors
    /// - `SerialOpenFailed` if the device cannot be opened
    /// - `UnsupportedBaudRate` for a rate with no POSIX constant
    /// - `SerialConfigFailed` if termios configuration fails
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let rate = baud_constant(baud)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)
            .map_err(|e| TransportError::serial_open_failed(&path_str, e.to_string()))?;

        // Raw mode, requested speed, one stop bit, no hardware flow control.
        let mut tio = termios::tcgetattr(&file)
            .map_err(|e| TransportError::serial_config_failed(&path_str, e.to_string()))?;
        termios::cfmakeraw(&mut tio);
        tio.control_flags
            .remove(ControlFlags::CSTOPB | ControlFlags::CRTSCTS);
        termios::cfsetspeed(&mut tio, rate)
            .map_err(|e| TransportError::serial_config_failed(&path_str, e.to_string()))?;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio)
            .map_err(|e| TransportError::serial_config_failed(&path_str, e.to_string()))?;

        // Discard anything queued before we were listening.
        termios::tcflush(&file, FlushArg::TCIOFLUSH)
            .map_err(|e| TransportError::serial_config_failed(&path_str, e.to_string()))?;

        let fd = AsyncFd::new(file)
            .map_err(|e| TransportError::serial_open_failed(&path_str, e.to_string()))?;

        debug!("Serial device {} open at {} baud", path_str, baud);

        Ok(Self { fd, path: path_str })
    }

    /// Returns the device path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl SerialLink for SerialPort {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self
                .fd
                .readable()
                .await
                .map_err(|e| TransportError::io("serial readiness", e))?;

            match guard.try_io(|inner| {
                let fd = inner.get_ref().as_raw_fd();
                let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    #[allow(clippy::cast_sign_loss)]
                    Ok(n as usize)
                }
            }) {
                Ok(result) => return result.map_err(|e| TransportError::io("serial read", e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self
                .fd
                .writable()
                .await
                .map_err(|e| TransportError::io("serial readiness", e))?;

            match guard.try_io(|inner| {
                let fd = inner.get_ref().as_raw_fd();
                let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    #[allow(clippy::cast_sign_loss)]
                    Ok(n as usize)
                }
            }) {
                Ok(result) => return result.map_err(|e| TransportError::io("serial write", e)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort").field("path", &self.path).finish()
    }
}

// ============================================
// Tests
// ============================================
