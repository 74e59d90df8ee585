//! HTTP API handlers and routing.

pub mod build;
pub mod error;
pub mod files;
pub mod heartbeat;

use axum::routing::{post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::state::AppState;

/// Create the coordinator router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/build", post(build::start_build))
        .route("/signal", post(build::signal_build))
        .route("/heartbeat", post(heartbeat::heartbeat))
        .route("/file", put(files::put_file).get(files::get_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
