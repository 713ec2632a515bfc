// ============================================
// File: crates/iplink-transport/src/tun/linux.rs
// ============================================
//! # Linux TUN Device Implementation
//!
//! ## Creation Reason
//! Provides the Linux-specific TUN device implementation using the
//! `/dev/net/tun` interface.
//!
//! ## Main Functionality
//! - TUN device creation via `TUNSETIFF` ioctl
//! - Interface configuration (point-to-point, MTU, address/netmask,
//!   up/down) via socket ioctls
//! - Async datagram read/write via tokio `AsyncFd`
//! - Interface set down on drop
//!
//! ## Linux TUN Interface
//! 1. Open `/dev/net/tun`
//! 2. `TUNSETIFF` with `IFF_TUN`
//! 3. Configure address, netmask, MTU, point-to-point flag
//! 4. Toggle `IFF_UP` as the link engine requests
//!
//! ## Required Capabilities
//! - `CAP_NET_ADMIN`, or run as root
//!
//! ## ⚠️ Important Note for Next Developer
//! - `IFF_NO_PI` is deliberately NOT set: every datagram carries the 4-byte
//!   packet-info prefix `{flags, proto}`, and the wire protocol transports
//!   that prefix verbatim. Setting `IFF_NO_PI` breaks wire compatibility.
//! - Interface ioctls go through a throwaway `AF_INET` datagram socket;
//!   the TUN fd itself only accepts `TUNSETIFF`-family requests
//!
//! ## Last Modified
//! v0.1.0 - Initial Linux TUN implementation

#![cfg(target_os = "linux")]

use std::fs::{File, OpenOptions};
use std::io;
use std::net::Ipv4Addr;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{TunInterface, TunOptions};

// ============================================
// Constants
// ============================================

/// Path to the TUN clone device.
const TUN_DEVICE_PATH: &str = "/dev/net/tun";

/// IFF_TUN flag - TUN device (L3 datagrams, no Ethernet headers).
const IFF_TUN: libc::c_short = 0x0001;

/// IFF_UP interface flag.
const IFF_UP: libc::c_short = 0x0001;

/// IFF_POINTOPOINT interface flag.
const IFF_POINTOPOINT: libc::c_short = 0x0010;

/// TUNSETIFF ioctl number.
const TUNSETIFF: libc::c_ulong = 0x4004_54ca;

// ============================================
// ifreq Structures
// ============================================

/// `ifreq` layout used with `TUNSETIFF` and `SIOC[GS]IFFLAGS`.
#[repr(C)]
struct IfReqFlags {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_flags: libc::c_short,
    _padding: [u8; 22],
}

/// `ifreq` layout used with `SIOCSIFMTU`.
#[repr(C)]
struct IfReqMtu {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_mtu: libc::c_int,
    _padding: [u8; 20],
}

/// `ifreq` layout used with `SIOCSIFADDR` / `SIOCSIFNETMASK`.
#[repr(C)]
struct IfReqAddr {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_addr: libc::sockaddr_in,
    _padding: [u8; 8],
}

/// Copies an interface name into an `ifr_name` field (truncating).
fn ifr_name(name: &str) -> [libc::c_char; libc::IFNAMSIZ] {
    let mut out = [0 as libc::c_char; libc::IFNAMSIZ];
    let bytes = name.as_bytes();
    let len = bytes.len().min(libc::IFNAMSIZ - 1);
    for (dst, &src) in out.iter_mut().zip(&bytes[..len]) {
        *dst = src as libc::c_char;
    }
    out
}

/// Reads an interface name back out of an `ifr_name` field.
fn ifr_name_to_string(name: &[libc::c_char; libc::IFNAMSIZ]) -> String {
    let bytes: Vec<u8> = name
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Builds a `sockaddr_in` for an interface-address ioctl.
fn sockaddr_in(addr: Ipv4Addr) -> libc::sockaddr_in {
    libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: 0,
        sin_addr: libc::in_addr {
            s_addr: u32::from_ne_bytes(addr.octets()),
        },
        sin_zero: [0; 8],
    }
}

// ============================================
// Interface ioctls
// ============================================

/// Runs `f` with a throwaway AF_INET datagram socket.
///
/// Interface configuration ioctls are addressed by name and need any
/// IP-family socket as a carrier.
fn with_ctl_socket<R>(f: impl FnOnce(RawFd) -> io::Result<R>) -> io::Result<R> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    let result = f(fd);
    unsafe {
        libc::close(fd);
    }
    result
}

/// Read-modify-writes the interface flags word.
fn if_set_flags(name: &str, flags: libc::c_short, set: bool) -> io::Result<()> {
    with_ctl_socket(|fd| {
        let mut ifr = IfReqFlags {
            ifr_name: ifr_name(name),
            ifr_flags: 0,
            _padding: [0; 22],
        };
        if unsafe { libc::ioctl(fd, libc::SIOCGIFFLAGS, &mut ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        if set {
            ifr.ifr_flags |= flags;
        } else {
            ifr.ifr_flags &= !flags;
        }
        if unsafe { libc::ioctl(fd, libc::SIOCSIFFLAGS, &ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    })
}

/// Sets the interface MTU.
fn if_set_mtu(name: &str, mtu: u16) -> io::Result<()> {
    with_ctl_socket(|fd| {
        let ifr = IfReqMtu {
            ifr_name: ifr_name(name),
            ifr_mtu: libc::c_int::from(mtu),
            _padding: [0; 20],
        };
        if unsafe { libc::ioctl(fd, libc::SIOCSIFMTU, &ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    })
}

/// Sets the interface address and netmask.
fn if_set_addr(name: &str, addr: Ipv4Addr, netmask: Ipv4Addr) -> io::Result<()> {
    with_ctl_socket(|fd| {
        let ifr = IfReqAddr {
            ifr_name: ifr_name(name),
            ifr_addr: sockaddr_in(addr),
            _padding: [0; 8],
        };
        if unsafe { libc::ioctl(fd, libc::SIOCSIFADDR, &ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        let ifr = IfReqAddr {
            ifr_name: ifr_name(name),
            ifr_addr: sockaddr_in(netmask),
            _padding: [0; 8],
        };
        if unsafe { libc::ioctl(fd, libc::SIOCSIFNETMASK, &ifr) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    })
}

// ============================================
// LinuxTun
// ============================================

/// Linux TUN device.
///
/// # Example
/// ```ignore
/// use iplink_transport::tun::LinuxTun;
/// use iplink_transport::traits::{TunInterface, TunOptions};
///
/// let tun = LinuxTun::create(TunOptions::new("uart0").with_mtu(3600))?;
/// tun.set_up(true).await?;
///
/// let mut buf = vec![0u8; 4 + 3600];
/// let len = tun.recv(&mut buf).await?;
/// ```
pub struct LinuxTun {
    /// Async file descriptor wrapper.
    fd: AsyncFd<File>,
    /// Actual device name as reported by the kernel.
    name: String,
    /// Configured MTU.
    mtu: u16,
}

impl LinuxTun {
    /// Creates and configures a TUN device.
    ///
    /// The device is left DOWN; the link engine decides when to bring it up.
    ///
    /// # Errors
    /// - `TunCreateFailed` if `/dev/net/tun` cannot be opened or claimed
    /// - `TunConfigFailed` if address/MTU/flag configuration fails
    pub fn create(options: TunOptions) -> Result<Self> {
        options.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(TUN_DEVICE_PATH)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    TransportError::tun_create_failed(
                        &options.name,
                        format!("open {TUN_DEVICE_PATH}: permission denied (need root or CAP_NET_ADMIN)"),
                    )
                } else {
                    TransportError::tun_create_failed(&options.name, e.to_string())
                }
            })?;

        // Claim the device. IFF_NO_PI is deliberately absent: datagrams
        // carry the 4-byte packet-info prefix the wire protocol forwards.
        let mut ifr = IfReqFlags {
            ifr_name: ifr_name(&options.name),
            ifr_flags: IFF_TUN,
            _padding: [0; 22],
        };
        if unsafe { libc::ioctl(file.as_raw_fd(), TUNSETIFF, &mut ifr) } < 0 {
            return Err(TransportError::tun_create_failed(
                &options.name,
                format!("TUNSETIFF failed: {}", io::Error::last_os_error()),
            ));
        }
        let name = ifr_name_to_string(&ifr.ifr_name);
        debug!("TUN device created: {}", name);

        if_set_flags(&name, IFF_POINTOPOINT, true)
            .map_err(|e| TransportError::tun_config_failed(&name, format!("point-to-point: {e}")))?;
        if_set_mtu(&name, options.mtu)
            .map_err(|e| TransportError::tun_config_failed(&name, format!("mtu: {e}")))?;
        if_set_addr(&name, options.address, options.netmask)
            .map_err(|e| TransportError::tun_config_failed(&name, format!("address: {e}")))?;

        let fd = AsyncFd::new(file)
            .map_err(|e| TransportError::tun_create_failed(&name, e.to_string()))?;

        debug!(
            "TUN device {} configured: {}/{} mtu {}",
            name, options.address, options.netmask, options.mtu
        );

        Ok(Self {
            fd,
            name,
            mtu: options.mtu,
        })
    }
}

#[async_trait]
impl TunInterface for LinuxTun {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self
                .fd
                .readable()
                .await
                .map_err(|e| TransportError::io("tun readiness", e))?;

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
                Ok(result) => return result.map_err(|e| TransportError::io("tun read", e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self
                .fd
                .writable()
                .await
                .map_err(|e| TransportError::io("tun readiness", e))?;

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
                Ok(result) => return result.map_err(|e| TransportError::io("tun write", e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn writable(&self) -> Result<()> {
        // Readiness only; the guard is dropped un-cleared because the
        // subsequent send performs the actual I/O.
        self.fd
            .writable()
            .await
            .map_err(|e| TransportError::io("tun readiness", e))?;
        Ok(())
    }

    async fn set_up(&self, up: bool) -> Result<()> {
        if_set_flags(&self.name, IFF_UP, up)
            .map_err(|e| TransportError::tun_config_failed(&self.name, format!("up/down: {e}")))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mtu(&self) -> u16 {
        self.mtu
    }
}

impl Drop for LinuxTun {
    fn drop(&mut self) {
        // Leave the interface down when the bridge exits.
        if let Err(e) = if_set_flags(&self.name, IFF_UP, false) {
            warn!("Failed to set {} down on exit: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for LinuxTun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxTun")
            .field("name", &self.name)
            .field("mtu", &self.mtu)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    // Creating a real TUN device requires CAP_NET_ADMIN; only the plumbing
    // around the ioctls is testable here.

    #[test]
    fn test_ifr_name_roundtrip() {
        let name = ifr_name("uart0");
        assert_eq!(ifr_name_to_string(&name), "uart0");
    }

    #[test]
    fn test_ifr_name_truncation() {
        let long = "a".repeat(32);
        let name = ifr_name(&long);
        assert!(ifr_name_to_string(&name).len() < libc::IFNAMSIZ);
    }

    #[test]
    fn test_sockaddr_network_order() {
        let sa = sockaddr_in(Ipv4Addr::new(10, 101, 0, 1));
        assert_eq!(sa.sin_addr.s_addr.to_ne_bytes(), [10, 101, 0, 1]);
    }

    #[test]
    fn test_ifreq_sizes_match_kernel_abi() {
        assert_eq!(std::mem::size_of::<IfReqFlags>(), 40);
        assert_eq!(std::mem::size_of::<IfReqMtu>(), 40);
        assert_eq!(std::mem::size_of::<IfReqAddr>(), 40);
    }
}
