// ============================================
// File: crates/iplink/src/main.rs
// ============================================
//! # IpLink Entry Point
//!
//! ## Creation Reason
//! Binary entry point for the serial IP bridge: CLI parsing, configuration
//! assembly, logging setup, and engine launch.
//!
//! ## Usage
//! ```bash
//! # Everything on the command line
//! iplink --uart /dev/ttyUSB0 --baud 921600 --ifname uart0 \
//!        --addr 10.101.0.1/30 --updown true
//!
//! # Or from a file, with selective overrides
//! iplink --config /etc/iplink.toml --verbose true
//!
//! # Show the effective configuration
//! iplink --config /etc/iplink.toml --dump
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Requires root or CAP_NET_ADMIN for TUN creation
//! - Exit code 0 on clean signal shutdown, 1 on any fatal error
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iplink::config::{Config, LinkAddr};

// ============================================
// CLI Definition
// ============================================

/// Bridge IP datagrams between a TUN interface and a serial link.
///
/// Every option can also be set in a TOML configuration file; command-line
/// values override the file.
#[derive(Parser, Debug)]
#[command(name = "iplink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump: bool,

    /// Serial device path
    #[arg(long)]
    uart: Option<PathBuf>,

    /// Serial baud rate (POSIX standard rates)
    #[arg(long)]
    baud: Option<u32>,

    /// TUN interface name
    #[arg(long)]
    ifname: Option<String>,

    /// Interface MTU
    #[arg(long)]
    mtu: Option<u16>,

    /// Local IP address with prefix length (e.g. 10.101.0.1/30)
    #[arg(long)]
    addr: Option<LinkAddr>,

    /// Keep-alive interval in milliseconds; 0 disables keep-alives
    #[arg(long)]
    keepalive_interval: Option<u64>,

    /// Missed keep-alive intervals before the peer is assumed gone
    #[arg(long)]
    keepalive_limit: Option<u32>,

    /// Bring the TUN interface up/down with peer liveness
    #[arg(long)]
    updown: Option<bool>,

    /// Print a throughput meter to stderr
    #[arg(long)]
    meter: Option<bool>,

    /// Enable wire-level hexdump logging
    #[arg(long)]
    verbose: Option<bool>,
}

/// Merges command-line overrides into a loaded configuration.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(uart) = &cli.uart {
        config.uart.clone_from(uart);
    }
    if let Some(baud) = cli.baud {
        config.baud = baud;
    }
    if let Some(ifname) = &cli.ifname {
        config.ifname.clone_from(ifname);
    }
    if let Some(mtu) = cli.mtu {
        config.mtu = mtu;
    }
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    if let Some(interval) = cli.keepalive_interval {
        config.keepalive_interval = interval;
    }
    if let Some(limit) = cli.keepalive_limit {
        config.keepalive_limit = limit;
    }
    if let Some(updown) = cli.updown {
        config.updown = updown;
    }
    if let Some(meter) = cli.meter {
        config.meter = meter;
    }
    if let Some(verbose) = cli.verbose {
        config.verbose = verbose;
    }
}

/// Loads the configuration file (if any) and applies CLI overrides.
async fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

// ============================================
// Main
// ============================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("iplink: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.dump {
        print!("{}", config.to_toml());
        return ExitCode::SUCCESS;
    }

    init_logging(if config.verbose { "debug" } else { "info" });

    // TUN creation needs CAP_NET_ADMIN; give a heads-up before the open
    // fails with a less obvious error.
    if unsafe { libc::geteuid() } != 0 {
        warn!("Not running as root; TUN setup requires CAP_NET_ADMIN");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()
        .ok();
}

/// Opens both devices and runs the engine until shutdown.
#[cfg(target_os = "linux")]
async fn run(config: Config) -> anyhow::Result<()> {
    use iplink::engine::LinkEngine;
    use iplink::signals::Signals;
    use iplink_transport::serial::SerialPort;
    use iplink_transport::traits::TunOptions;
    use iplink_transport::tun::LinuxTun;

    let uart = SerialPort::open(&config.uart, config.baud)?;
    let tun = LinuxTun::create(
        TunOptions::new(&config.ifname)
            .with_address(config.addr.address())
            .with_netmask(config.addr.netmask())
            .with_mtu(config.mtu),
    )?;
    let signals = Signals::new()?;

    let mut engine = LinkEngine::new(config, uart, tun, signals);
    engine.run().await?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("iplink requires Linux (no TUN support on this platform)")
}

// ============================================
// Tests
// ============================================
