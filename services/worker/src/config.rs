//! Configuration for the worker.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Coordinator base URL.
    pub coordinator_url: String,

    /// Address the artifact endpoint listens on.
    pub listen_addr: SocketAddr,

    /// Base URL peers use to reach this worker's artifact endpoint.
    /// Doubles as the worker's identity.
    pub public_endpoint: String,

    /// Root directory for the local file and artifact caches.
    pub cache_dir: PathBuf,

    /// Delay between heartbeats when idle or after a transport error.
    pub poll_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let coordinator_url = std::env::var("QUARRY_COORDINATOR_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let listen_addr: SocketAddr = std::env::var("QUARRY_WORKER_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5090".to_string())
            .parse()?;

        let public_endpoint = std::env::var("QUARRY_WORKER_ENDPOINT")
            .unwrap_or_else(|_| format!("http://{listen_addr}"));

        let cache_dir = std::env::var("QUARRY_WORKER_CACHE_DIR")
            .unwrap_or_else(|_| "/var/lib/quarry/worker".to_string())
            .into();

        let poll_interval = std::env::var("QUARRY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(200));

        let log_level = std::env::var("QUARRY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            coordinator_url,
            listen_addr,
            public_endpoint,
            cache_dir,
            poll_interval,
            log_level,
        })
    }
}
