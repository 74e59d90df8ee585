//! HTTP client for the coordinator's build protocol.

use anyhow::{anyhow, bail, Context, Result};
use futures_util::StreamExt;
use quarry_api::{BuildRequest, BuildStarted, SignalRequest, SignalResponse, StatusUpdate};
use quarry_id::BuildId;

/// Legacy end-of-stream sentinel some coordinators emit instead of an
/// explicit finished frame.
const LEGACY_EOF: &str = "EOF";

/// Client for `POST /build` and `POST /signal`.
#[derive(Debug, Clone)]
pub struct BuildClient {
    client: reqwest::Client,
    base_url: String,
}

impl BuildClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submits a graph. Returns the started frame plus a reader over
    /// the rest of the status stream.
    pub async fn start_build(
        &self,
        request: &BuildRequest,
    ) -> Result<(BuildStarted, StatusReader)> {
        let response = self
            .client
            .post(format!("{}/build", self.base_url))
            .json(request)
            .send()
            .await
            .context("submitting build")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("coordinator rejected build ({status}): {body}");
        }

        let mut reader = StatusReader::new(response);
        let first = reader
            .next_line()
            .await?
            .ok_or_else(|| anyhow!("status stream ended before the started frame"))?;
        let started: BuildStarted =
            serde_json::from_str(&first).context("parsing started frame")?;

        Ok((started, reader))
    }

    /// Signals that every missing source has been uploaded.
    pub async fn signal_build(
        &self,
        build_id: BuildId,
        request: &SignalRequest,
    ) -> Result<SignalResponse> {
        let response = self
            .client
            .post(format!("{}/signal?build_id={build_id}", self.base_url))
            .json(request)
            .send()
            .await
            .context("signalling build")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("signal rejected ({status}): {body}");
        }

        Ok(response.json().await?)
    }
}

/// Line-oriented reader over a build's status stream.
pub struct StatusReader {
    body: std::pin::Pin<
        Box<dyn futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>,
    >,
    buffer: Vec<u8>,
    finished: bool,
}

impl StatusReader {
    fn new(response: reqwest::Response) -> Self {
        Self {
            body: Box::pin(response.bytes_stream()),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// The next raw line, or `None` at end of body.
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let rest = self.buffer.split_off(pos + 1);
                let mut line = std::mem::replace(&mut self.buffer, rest);
                line.pop();
                return Ok(Some(String::from_utf8(line).context("non-UTF8 frame")?));
            }

            match self.body.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None if self.buffer.is_empty() => return Ok(None),
                None => {
                    let line = std::mem::take(&mut self.buffer);
                    return Ok(Some(String::from_utf8(line).context("non-UTF8 frame")?));
                }
            }
        }
    }

    /// The next status update. Terminal frames end the stream: a
    /// finished frame (or the legacy `"EOF"` failure sentinel) yields
    /// `None`; a real failure frame is yielded once and the stream
    /// ends after it.
    pub async fn next(&mut self) -> Result<Option<StatusUpdate>> {
        if self.finished {
            return Ok(None);
        }

        let Some(line) = self.next_line().await? else {
            return Ok(None);
        };
        let update: StatusUpdate = serde_json::from_str(&line).context("parsing status frame")?;

        match &update {
            StatusUpdate::BuildFinished(_) => {
                self.finished = true;
                Ok(None)
            }
            StatusUpdate::BuildFailed(failed) if failed.error == LEGACY_EOF => {
                self.finished = true;
                Ok(None)
            }
            StatusUpdate::BuildFailed(_) => {
                self.finished = true;
                Ok(Some(update))
            }
            StatusUpdate::JobFinished(_) => Ok(Some(update)),
        }
    }
}
