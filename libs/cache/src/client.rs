//! HTTP transfer client for the coordinator's file endpoint.

use std::path::Path;

use quarry_id::FileId;
use thiserror::Error;
use tracing::debug;

use crate::error::CacheError;
use crate::file::FileCache;

/// Errors from moving cache contents over the network.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("local I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for `PUT /file` and `GET /file` on the coordinator.
#[derive(Debug, Clone)]
pub struct FileClient {
    client: reqwest::Client,
    endpoint: String,
}

impl FileClient {
    /// `endpoint` is the coordinator's base URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, id: FileId) -> String {
        format!("{}/file?id={}", self.endpoint, id)
    }

    /// Uploads a local file's bytes under `id`.
    pub async fn upload(&self, id: FileId, local_path: &Path) -> Result<(), TransferError> {
        let body = tokio::fs::read(local_path).await?;
        let response = self.client.put(self.url(id)).body(body).send().await?;

        if !response.status().is_success() {
            return Err(TransferError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        debug!(id = %id, path = %local_path.display(), "file uploaded");
        Ok(())
    }

    /// Downloads `id` into the local cache. A no-op when the file is
    /// already present or another task is fetching it.
    pub async fn download(&self, id: FileId, cache: &FileCache) -> Result<(), TransferError> {
        if cache.contains(id) {
            return Ok(());
        }

        let response = self.client.get(self.url(id)).send().await?;
        if !response.status().is_success() {
            return Err(TransferError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let bytes = response.bytes().await?;

        match cache.put_bytes(id, &bytes) {
            Ok(()) => {
                debug!(id = %id, bytes = bytes.len(), "file downloaded");
                Ok(())
            }
            // A concurrent download claimed the entry first.
            Err(CacheError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
