//! The worker's artifact endpoint.
//!
//! Peers fetch `GET /artifact?id=` to pull a committed artifact
//! directory as a tar stream.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use quarry_cache::{tarstream, ArtifactCache};
use quarry_id::JobId;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Create the worker router.
pub fn create_router(artifacts: ArtifactCache) -> Router {
    Router::new()
        .route("/artifact", get(get_artifact))
        .layer(TraceLayer::new_for_http())
        .with_state(artifacts)
}

#[derive(Debug, Deserialize)]
struct ArtifactParams {
    id: String,
}

async fn get_artifact(
    State(artifacts): State<ArtifactCache>,
    Query(params): Query<ArtifactParams>,
) -> Result<Vec<u8>, Response> {
    let id = JobId::parse(&params.id)
        .map_err(|e| plain(StatusCode::BAD_REQUEST, format!("invalid id: {e}")))?;

    let handle = artifacts
        .get(id)
        .await
        .map_err(|e| plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let bytes = tarstream::pack(handle.path())
        .map_err(|e| plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    debug!(id = %id, bytes = bytes.len(), "artifact served");
    Ok(bytes)
}

fn plain(status: StatusCode, message: String) -> Response {
    (status, message).into_response()
}
