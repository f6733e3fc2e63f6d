// crates/server/src/config.rs
//! Environment-driven server configuration.
//!
//! The engine never reads the environment; only this collaborator does.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default port for the monitor.
pub const DEFAULT_PORT: u16 = 47894;

/// Default log location, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "logs/pokestrator.log";

/// Physical lines read from the end of the log per poll. Twice the engine's
/// non-empty window so blank lines do not shrink what it sees.
pub const READ_WINDOW_LINES: usize = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub log_path: PathBuf,
    pub addr: SocketAddr,
    /// Dashboard assets served at `/`; API-only when `None`.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve through an arbitrary lookup, so tests need not touch the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_path = lookup("POKESTRATOR_LOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));

        let port = lookup("POKESTRATOR_MONITOR_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|raw| match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(value = %raw, "invalid port, using default {DEFAULT_PORT}");
                    None
                }
            })
            .unwrap_or(DEFAULT_PORT);

        let host = lookup("POKESTRATOR_MONITOR_HOST")
            .and_then(|raw| match raw.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(value = %raw, "invalid host, using 127.0.0.1");
                    None
                }
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let static_dir = lookup("STATIC_DIR").map(PathBuf::from);

        Self {
            log_path,
            addr: SocketAddr::new(host, port),
            static_dir,
        }
    }
}
