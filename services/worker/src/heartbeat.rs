//! Heartbeat client for reporting to the coordinator.
//!
//! Each beat carries the worker's free capacity and everything that
//! finished since the last one; the response carries new work.

use std::time::Duration;

use anyhow::Result;
use quarry_api::{HeartbeatRequest, HeartbeatResponse};

/// Upper bound on one heartbeat round-trip, comfortably above the
/// coordinator's pick timeout.
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for `POST /heartbeat`.
#[derive(Debug, Clone)]
pub struct HeartbeatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HeartbeatClient {
    /// `coordinator_url` is the coordinator's base URL.
    pub fn new(coordinator_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/heartbeat", coordinator_url.trim_end_matches('/')),
        }
    }

    /// Sends a single heartbeat.
    pub async fn heartbeat(&self, request: &HeartbeatRequest) -> Result<HeartbeatResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("heartbeat failed with status: {}", response.status());
        }

        let body: HeartbeatResponse = response.json().await?;
        Ok(body)
    }
}
