//! Build submission and signal endpoints.
//!
//! `POST /build` answers with a newline-delimited JSON stream: one
//! `BuildStarted` frame, then `StatusUpdate` frames until a terminal
//! one. The response streams from a channel fed by the build driver
//! task, flushed frame by frame.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures_util::stream::unfold;
use quarry_api::{BuildRequest, BuildStarted, SignalRequest, SignalResponse};
use quarry_graph::topsort;
use quarry_id::BuildId;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::api::error::ApiError;
use crate::build;
use crate::state::AppState;

/// Frames buffered between the driver and a slow client.
const STREAM_BUFFER: usize = 16;

pub async fn start_build(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: BuildRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid build request: {e}")))?;
    let graph = request.graph;

    graph
        .validate()
        .map_err(|e| ApiError::bad_request(format!("invalid graph: {e}")))?;
    let ordered = topsort(&graph.jobs)
        .map_err(|e| ApiError::bad_request(format!("invalid graph: {e}")))?;

    let missing_files: Vec<_> = graph
        .source_files
        .keys()
        .copied()
        .filter(|id| !state.file_cache().contains(*id))
        .collect();

    let build_id = BuildId::random();
    info!(
        build = %build_id,
        jobs = ordered.len(),
        missing = missing_files.len(),
        "build accepted"
    );

    let gate = state.gates().register(build_id);
    let started = BuildStarted {
        id: build_id,
        missing_files,
    };

    let (frames_tx, frames_rx) = mpsc::channel::<String>(STREAM_BUFFER);
    tokio::spawn(build::run_build(
        state.clone(),
        build_id,
        ordered,
        graph,
        started,
        gate,
        frames_tx,
    ));

    let stream = unfold(frames_rx, |mut rx| async move {
        let line = rx.recv().await?;
        Some((Ok::<Bytes, Infallible>(Bytes::from(line + "\n")), rx))
    });

    let body = Body::from_stream(stream);
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SignalParams {
    build_id: String,
}

pub async fn signal_build(
    State(state): State<AppState>,
    Query(params): Query<SignalParams>,
    body: Bytes,
) -> Result<Json<SignalResponse>, ApiError> {
    let build_id = BuildId::parse(&params.build_id)
        .map_err(|e| ApiError::bad_request(format!("invalid build_id: {e}")))?;

    let request: SignalRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid signal request: {e}")))?;
    if request.upload_done.is_none() {
        return Err(ApiError::bad_request("signal carries no upload_done"));
    }

    if !state.gates().signal(build_id) {
        return Err(ApiError::bad_request(format!("unknown build {build_id}")));
    }

    info!(build = %build_id, "upload done");
    Ok(Json(SignalResponse {}))
}
