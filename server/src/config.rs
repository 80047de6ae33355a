use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Relay configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stroke relay listen address (default: 127.0.0.1:12345)
    pub relay_addr: SocketAddr,
    /// Admin HTTP listen address (default: 127.0.0.1:8080)
    pub admin_addr: SocketAddr,
    /// Directory receiving saved boards (default: "Saved Boards")
    pub save_dir: PathBuf,
    /// Largest accepted snapshot upload in bytes (default: 64 MiB)
    pub max_snapshot_bytes: u64,
    /// Time allowed for one write to a peer before it counts as unreachable
    pub write_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddress { name: &'static str, value: String },
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

impl std::default::Default for Config {
    fn default() -> Self {
        Self {
            relay_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            admin_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            save_dir: PathBuf::from("Saved Boards"),
            max_snapshot_bytes: 64 * 1024 * 1024,
            write_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            relay_addr: parse_addr("RELAY_ADDR", defaults.relay_addr)?,
            admin_addr: parse_addr("ADMIN_ADDR", defaults.admin_addr)?,
            save_dir: env::var("SAVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.save_dir),
            max_snapshot_bytes: parse_number("MAX_SNAPSHOT_BYTES", defaults.max_snapshot_bytes)?,
            write_timeout: Duration::from_millis(parse_number(
                "WRITE_TIMEOUT_MS",
                defaults.write_timeout.as_millis() as u64,
            )?),
        })
    }
}

fn parse_addr(name: &'static str, default: SocketAddr) -> Result<SocketAddr, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidAddress { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
