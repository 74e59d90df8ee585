//! Content-addressed file transfer endpoints.
//!
//! Uploads go through a keyed single-flight: concurrent PUTs of one ID
//! collapse to a single cache write, and every caller observes the
//! same outcome. Success is memoized for the cache lifetime; a failure
//! is evicted so a later retry can succeed.

use std::collections::HashMap;

use axum::extract::{Query, State};
use bytes::Bytes;
use parking_lot::Mutex;
use quarry_cache::{CacheError, FileCache};
use quarry_id::FileId;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::debug;

use crate::api::error::ApiError;
use crate::state::AppState;

type Outcome = Result<(), String>;

enum Flight {
    InFlight(watch::Receiver<Option<Outcome>>),
    Done,
}

enum Role {
    Leader(watch::Sender<Option<Outcome>>),
    Follower(watch::Receiver<Option<Outcome>>),
}

/// Keyed single-flight over the file cache's write path.
pub struct UploadGroup {
    flights: Mutex<HashMap<FileId, Flight>>,
}

impl UploadGroup {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Writes `bytes` under `id` once, no matter how many callers
    /// arrive concurrently.
    pub async fn put(&self, cache: &FileCache, id: FileId, bytes: &[u8]) -> Outcome {
        let role = {
            let mut flights = self.flights.lock();
            match flights.get(&id) {
                Some(Flight::Done) => return Ok(()),
                Some(Flight::InFlight(rx)) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    flights.insert(id, Flight::InFlight(rx));
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => {
                debug!(id = %id, "joining in-flight upload");
                match rx.wait_for(|outcome| outcome.is_some()).await {
                    Ok(outcome) => outcome.clone().unwrap_or(Ok(())),
                    Err(_) => Err("upload abandoned".to_string()),
                }
            }
            Role::Leader(tx) => {
                // A pre-seeded cache entry counts as success: content
                // addressing makes the bytes interchangeable.
                let outcome = match cache.put_bytes(id, bytes) {
                    Ok(()) | Err(CacheError::AlreadyExists(_)) => Ok(()),
                    Err(e) => Err(e.to_string()),
                };

                {
                    let mut flights = self.flights.lock();
                    match &outcome {
                        Ok(()) => {
                            flights.insert(id, Flight::Done);
                        }
                        Err(_) => {
                            flights.remove(&id);
                        }
                    }
                }

                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
        }
    }
}

impl Default for UploadGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    id: String,
}

pub async fn put_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
    body: Bytes,
) -> Result<(), ApiError> {
    let id = FileId::parse(&params.id)
        .map_err(|e| ApiError::bad_request(format!("invalid id: {e}")))?;

    state
        .uploads()
        .put(state.file_cache(), id, &body)
        .await
        .map_err(ApiError::internal)
}

pub async fn get_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Vec<u8>, ApiError> {
    let id = FileId::parse(&params.id)
        .map_err(|e| ApiError::bad_request(format!("invalid id: {e}")))?;

    let handle = state
        .file_cache()
        .get(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tokio::fs::read(handle.path())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))
}
