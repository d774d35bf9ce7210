//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use flipdot_core::{GridLimits, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Default port for the flipdot server.
pub const DEFAULT_PORT: u16 = 9474;

/// Command-line arguments for flipdot-server.
#[derive(Debug, Clone, Parser)]
#[command(name = "flipdot-server")]
#[command(about = "Flipdot animation library and display server")]
#[command(version)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "FLIPDOT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "FLIPDOT_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Animation library file
    #[arg(long, env = "FLIPDOT_DATA_FILE", default_value = "flipdot-animations.json")]
    pub data_file: PathBuf,

    /// Seconds between library flushes
    #[arg(
        long,
        env = "FLIPDOT_FLUSH_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub flush_interval_secs: u64,

    /// Display width in cells
    #[arg(long, env = "FLIPDOT_GRID_WIDTH", default_value_t = DEFAULT_WIDTH)]
    pub grid_width: usize,

    /// Display height in cells
    #[arg(long, env = "FLIPDOT_GRID_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    pub grid_height: usize,
}

impl ServerConfig {
    /// Socket address to bind.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Document size limits for this display.
    #[must_use]
    pub fn limits(&self) -> GridLimits {
        GridLimits::new(self.grid_width, self.grid_height)
    }

    /// Period of the background flush.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}
