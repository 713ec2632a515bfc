// ============================================
// File: crates/iplink/src/config.rs
// ============================================
//! # Link Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the IpLink bridge, supporting a
//! TOML file with per-key command-line overrides.
//!
//! ## Main Functionality
//! - `Config`: all tunables of the bridge, with defaults
//! - `LinkAddr`: IPv4 address with prefix length ("10.101.0.1/30")
//! - TOML load/dump and semantic validation
//!
//! ## Example Configuration
//! ```toml
//! uart = "/dev/ttyUSB0"
//! baud = 115200
//! ifname = "uart0"
//! mtu = 1280
//! addr = "10.101.0.1/30"
//! keepalive_interval = 500
//! keepalive_limit = 3
//! updown = true
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Semantic validation lives HERE, not in the engine: by the time the
//!   engine runs, the keep-alive and updown rules are known to be coherent
//! - All config changes require a restart
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::{LinkError, Result};

// ============================================
// LinkAddr
// ============================================

/// Error parsing a [`LinkAddr`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address '{0}': expected a.b.c.d or a.b.c.d/prefix")]
pub struct AddrParseError(String);

/// An IPv4 address with a prefix length; the local end of the
/// point-to-point link.
///
/// # Example
/// ```
/// use iplink::config::LinkAddr;
/// use std::net::Ipv4Addr;
///
/// let addr: LinkAddr = "10.101.0.1/30".parse().unwrap();
/// assert_eq!(addr.address(), Ipv4Addr::new(10, 101, 0, 1));
/// assert_eq!(addr.netmask(), Ipv4Addr::new(255, 255, 255, 252));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkAddr {
    address: Ipv4Addr,
    prefix: u8,
}

impl LinkAddr {
    /// Creates an address from its parts.
    ///
    /// # Errors
    /// Returns error if the prefix length exceeds 32.
    pub fn new(address: Ipv4Addr, prefix: u8) -> std::result::Result<Self, AddrParseError> {
        if prefix > 32 {
            return Err(AddrParseError(format!("{address}/{prefix}")));
        }
        Ok(Self { address, prefix })
    }

    /// Returns the IPv4 address.
    #[must_use]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns the netmask corresponding to the prefix length.
    #[must_use]
    pub fn netmask(&self) -> Ipv4Addr {
        let bits = if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        };
        Ipv4Addr::from(bits)
    }
}

impl FromStr for LinkAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || AddrParseError(s.to_string());
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let address = addr.parse().map_err(|_| err())?;
                let prefix: u8 = prefix.parse().map_err(|_| err())?;
                Self::new(address, prefix)
            }
            // A bare address is a host route.
            None => Self::new(s.parse().map_err(|_| err())?, 32),
        }
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl TryFrom<String> for LinkAddr {
    type Error = AddrParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LinkAddr> for String {
    fn from(addr: LinkAddr) -> Self {
        addr.to_string()
    }
}

// ============================================
// Config
// ============================================

/// Bridge configuration.
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Serial device path.
    #[serde(default = "default_uart")]
    pub uart: PathBuf,

    /// Serial baud rate (POSIX standard rates only).
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// TUN interface name.
    #[serde(default = "default_ifname")]
    pub ifname: String,

    /// Interface MTU.
    #[serde(default = "default_mtu")]
    pub mtu: u16,

    /// Local IP address with prefix length.
    #[serde(default = "default_addr")]
    pub addr: LinkAddr,

    /// Keep-alive interval in milliseconds; 0 disables keep-alives.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval: u64,

    /// Missed keep-alive intervals before the peer is assumed gone.
    #[serde(default = "default_keepalive_limit")]
    pub keepalive_limit: u32,

    /// Bring the TUN interface up/down with peer liveness.
    #[serde(default)]
    pub updown: bool,

    /// Print a throughput meter to stderr.
    #[serde(default)]
    pub meter: bool,

    /// Enable wire-level hexdump logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_uart() -> PathBuf {
    PathBuf::from("/dev/ttyS0")
}

fn default_baud() -> u32 {
    115_200
}

fn default_ifname() -> String {
    "uart0".to_string()
}

fn default_mtu() -> u16 {
    3600
}

fn default_addr() -> LinkAddr {
    LinkAddr {
        address: Ipv4Addr::new(10, 101, 0, 1),
        prefix: 30,
    }
}

fn default_keepalive_interval() -> u64 {
    500
}

fn default_keepalive_limit() -> u32 {
    3
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LinkError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| LinkError::config_load(&path_str, e.to_string()))?;

        Ok(config)
    }

    /// Parses configuration from a TOML string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the string cannot be parsed.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LinkError::config_load("<string>", e.to_string()))
    }

    /// Validates the semantic rules that span multiple keys.
    ///
    /// # Errors
    /// - MTU below 64
    /// - Keep-alives enabled with a limit of 1 or less
    /// - `updown` requested with keep-alives disabled
    pub fn validate(&self) -> Result<()> {
        if self.mtu < 64 {
            return Err(LinkError::config_invalid(
                "mtu",
                "MTU must be at least 64 bytes",
            ));
        }
        if self.keepalive_interval > 0 && self.keepalive_limit <= 1 {
            return Err(LinkError::config_invalid(
                "keepalive_limit",
                "must be at least 2 when keep-alives are enabled",
            ));
        }
        if self.updown && self.keepalive_interval == 0 {
            return Err(LinkError::config_invalid(
                "updown",
                "requires keep-alives (set keepalive_interval > 0)",
            ));
        }
        Ok(())
    }

    /// Serializes the configuration to TOML.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uart: default_uart(),
            baud: default_baud(),
            ifname: default_ifname(),
            mtu: default_mtu(),
            addr: default_addr(),
            keepalive_interval: default_keepalive_interval(),
            keepalive_limit: default_keepalive_limit(),
            updown: false,
            meter: false,
            verbose: false,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.ifname, "uart0");
        assert_eq!(config.keepalive_interval, 500);
        assert_eq!(config.keepalive_limit, 3);
        assert!(!config.updown);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            uart = "/dev/ttyUSB0"
            baud = 921600
            updown = true
            "#,
        )
        .unwrap();
        assert_eq!(config.uart, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.baud, 921_600);
        assert!(config.updown);
        // Unspecified keys keep their defaults.
        assert_eq!(config.mtu, 3600);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("bogus_key = 1").is_err());
    }

    #[test]
    fn test_validation_rules() {
        let mut config = Config::default();
        config.mtu = 32;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.keepalive_limit = 1;
        assert!(config.validate().is_err());
        // A limit of 1 is fine when keep-alives are off entirely.
        config.keepalive_interval = 0;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.updown = true;
        config.keepalive_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let restored = Config::parse(&config.to_toml()).unwrap();
        assert_eq!(restored.addr, config.addr);
        assert_eq!(restored.mtu, config.mtu);
        assert_eq!(restored.uart, config.uart);
    }

    #[test]
    fn test_link_addr_parse() {
        let addr: LinkAddr = "10.101.0.1/30".parse().unwrap();
        assert_eq!(addr.address(), Ipv4Addr::new(10, 101, 0, 1));
        assert_eq!(addr.prefix(), 30);
        assert_eq!(addr.netmask(), Ipv4Addr::new(255, 255, 255, 252));
        assert_eq!(addr.to_string(), "10.101.0.1/30");

        // Bare address is a /32.
        let addr: LinkAddr = "192.168.7.1".parse().unwrap();
        assert_eq!(addr.prefix(), 32);
        assert_eq!(addr.netmask(), Ipv4Addr::new(255, 255, 255, 255));

        assert!("10.0.0.1/33".parse::<LinkAddr>().is_err());
        assert!("not-an-address".parse::<LinkAddr>().is_err());
        assert!("10.0.0.1/x".parse::<LinkAddr>().is_err());
    }

    #[test]
    fn test_link_addr_netmask_edges() {
        let addr: LinkAddr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(addr.netmask(), Ipv4Addr::new(0, 0, 0, 0));
        let addr: LinkAddr = "10.0.0.1/24".parse().unwrap();
        assert_eq!(addr.netmask(), Ipv4Addr::new(255, 255, 255, 0));
    }
}
