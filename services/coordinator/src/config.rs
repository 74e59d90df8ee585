//! Configuration for the coordinator.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on for HTTP connections.
    pub listen_addr: SocketAddr,

    /// Root directory for the source file cache.
    pub cache_dir: PathBuf,

    /// How long a heartbeat may wait for work before answering with an
    /// empty job map.
    pub pick_timeout: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("QUARRY_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let cache_dir = std::env::var("QUARRY_CACHE_DIR")
            .unwrap_or_else(|_| "/var/lib/quarry/coordinator".to_string())
            .into();

        let pick_timeout = std::env::var("QUARRY_PICK_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(500));

        let log_level = std::env::var("QUARRY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            listen_addr,
            cache_dir,
            pick_timeout,
            log_level,
        })
    }
}
