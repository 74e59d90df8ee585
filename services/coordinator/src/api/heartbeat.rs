//! Worker heartbeat endpoint.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use quarry_api::{HeartbeatRequest, HeartbeatResponse};
use tokio::time::timeout;
use tracing::debug;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Absorbs a worker's report and, when it has a free slot, waits
/// briefly for a job to hand back. The pick never outlives the
/// configured timeout, so heartbeats stay responsive on an idle queue.
pub async fn heartbeat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let request: HeartbeatRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid heartbeat: {e}")))?;

    for result in request.finished_jobs {
        let job_id = result.id;
        state
            .scheduler()
            .on_job_complete(&request.worker_id, job_id, result);
    }

    for artifact in request.added_artifacts {
        state
            .scheduler()
            .register_artifact(artifact, &request.worker_id);
    }

    let mut jobs_to_run = HashMap::new();
    if request.free_slots > 0 {
        let pick = state.scheduler().pick_job(&request.worker_id);
        if let Ok(Some(job)) = timeout(state.config().pick_timeout, pick).await {
            debug!(worker = %request.worker_id, job = %job.spec.job.id, "job assigned");
            jobs_to_run.insert(job.spec.job.id, job.spec.clone());
        }
    }

    Ok(Json(HeartbeatResponse { jobs_to_run }))
}
