//! # quarry-api
//!
//! Wire types for the coordinator's protocols:
//!
//! - the **build protocol** (submit a graph, stream status frames),
//! - the **signal protocol** (release a build's upload gate),
//! - the **heartbeat protocol** (workers report results, receive work).
//!
//! All bodies are JSON. Captured process output travels base64-encoded.

mod build;
mod bytes;
mod heartbeat;

pub use build::{
    BuildFailed, BuildFinished, BuildRequest, BuildStarted, JobResult, SignalRequest,
    SignalResponse, StatusUpdate, UploadDone,
};
pub use heartbeat::{HeartbeatRequest, HeartbeatResponse, JobSpec};
