//! Heartbeat protocol types.
//!
//! Workers poll the coordinator with their free capacity and the
//! results accumulated since the last beat; the coordinator answers
//! with jobs to run.

use std::collections::HashMap;

use quarry_graph::Job;
use quarry_id::{FileId, JobId, WorkerId};
use serde::{Deserialize, Serialize};

use crate::build::JobResult;

/// Body of `POST /heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// The reporting worker; also the endpoint peers fetch artifacts
    /// from.
    pub worker_id: WorkerId,

    /// Execution slots the worker can fill right now.
    pub free_slots: u32,

    /// Jobs finished since the last heartbeat.
    #[serde(default)]
    pub finished_jobs: Vec<JobResult>,

    /// Artifacts committed locally since the last heartbeat.
    #[serde(default)]
    pub added_artifacts: Vec<JobId>,
}

/// Response body of `POST /heartbeat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    /// Jobs assigned to this worker; at most `free_slots` entries.
    /// An empty map is a legal "nothing to do" answer.
    #[serde(default)]
    pub jobs_to_run: HashMap<JobId, JobSpec>,
}

/// Everything a worker needs to execute one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(flatten)]
    pub job: Job,

    /// The subset of the graph's source files this job reads:
    /// file ID → path relative to the staged source root.
    #[serde(default)]
    pub source_files: HashMap<FileId, String>,

    /// Where to fetch each dep's artifact: dep job ID → owning worker.
    #[serde(default)]
    pub artifacts: HashMap<JobId, WorkerId>,
}
