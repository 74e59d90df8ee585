//! Build orchestration: the per-build upload gate and the driver that
//! walks a sorted graph through the scheduler, emitting status frames.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;
use quarry_api::{BuildFailed, BuildFinished, BuildStarted, JobSpec, StatusUpdate};
use quarry_graph::{Graph, Job};
use quarry_id::BuildId;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::scheduler::Scheduler;
use crate::state::AppState;

/// One latch per in-flight build, keyed by build ID. The first
/// upload-done signal opens the latch; extras are absorbed; signals
/// for unknown builds are rejected.
pub struct UploadGates {
    gates: Mutex<HashMap<BuildId, watch::Sender<bool>>>,
}

impl UploadGates {
    pub fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the gate for a new build and returns the waiter side.
    pub fn register(&self, id: BuildId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().insert(id, tx);
        rx
    }

    /// Opens a build's gate. Returns false for unknown builds.
    pub fn signal(&self, id: BuildId) -> bool {
        match self.gates.lock().get(&id) {
            Some(gate) => {
                gate.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Drops a finished build's gate.
    pub fn unregister(&self, id: BuildId) {
        self.gates.lock().remove(&id);
    }
}

impl Default for UploadGates {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one build to its terminal frame. Spawned per `POST /build`;
/// frame order is the stream order since this is the only producer.
pub async fn run_build(
    state: AppState,
    build_id: BuildId,
    jobs: Vec<Job>,
    graph: Graph,
    started: BuildStarted,
    gate: watch::Receiver<bool>,
    frames: mpsc::Sender<String>,
) {
    let outcome = drive(&state, build_id, jobs, &graph, started, gate, &frames).await;
    state.gates().unregister(build_id);

    let terminal = match outcome {
        Ok(()) => {
            info!(build = %build_id, "build finished");
            StatusUpdate::BuildFinished(BuildFinished {})
        }
        Err(e) => {
            warn!(build = %build_id, error = %e, "build failed");
            StatusUpdate::BuildFailed(BuildFailed {
                error: e.to_string(),
            })
        }
    };
    // A disconnected client no longer cares about the terminal frame.
    let _ = send_frame(&frames, &terminal).await;
}

async fn drive(
    state: &AppState,
    build_id: BuildId,
    jobs: Vec<Job>,
    graph: &Graph,
    started: BuildStarted,
    mut gate: watch::Receiver<bool>,
    frames: &mpsc::Sender<String>,
) -> Result<()> {
    if !send_frame(frames, &started).await {
        bail!("client disconnected before the build started");
    }

    tokio::select! {
        opened = gate.wait_for(|open| *open) => {
            if opened.is_err() {
                bail!("upload gate dropped");
            }
        }
        _ = frames.closed() => bail!("client disconnected while uploading"),
    }
    info!(build = %build_id, jobs = jobs.len(), "sources uploaded, dispatching");

    for job in jobs {
        let spec = job_spec(&job, graph, state.scheduler())?;
        let pending = state.scheduler().schedule_job(spec);

        tokio::select! {
            () = pending.wait() => {}
            _ = frames.closed() => bail!("client disconnected mid-build"),
        }

        let result = pending
            .result()
            .ok_or_else(|| anyhow!("job {} finished without a result", job.id))?;
        debug!(build = %build_id, job = %job.id, exit_code = result.exit_code, "job finished");

        if !send_frame(frames, &StatusUpdate::JobFinished(result)).await {
            bail!("client disconnected mid-build");
        }
    }

    Ok(())
}

/// Assembles the spec a worker needs: the source files the job reads
/// and the location of every dep's artifact. Jobs are dispatched in
/// topological order, so each dep's owner is already on record.
fn job_spec(job: &Job, graph: &Graph, scheduler: &Scheduler) -> Result<JobSpec> {
    let source_files = graph
        .source_files
        .iter()
        .filter(|(_, path)| job.inputs.iter().any(|input| input == *path))
        .map(|(id, path)| (*id, path.clone()))
        .collect();

    let mut artifacts = HashMap::new();
    for dep in &job.deps {
        let worker = scheduler
            .locate_artifact(*dep)
            .ok_or_else(|| anyhow!("no worker holds the artifact of dep {dep}"))?;
        artifacts.insert(*dep, worker);
    }

    Ok(JobSpec {
        job: job.clone(),
        source_files,
        artifacts,
    })
}

/// Serializes one frame onto the stream. False when the client is
/// gone.
async fn send_frame<T: Serialize>(frames: &mpsc::Sender<String>, frame: &T) -> bool {
    match serde_json::to_string(frame) {
        Ok(line) => frames.send(line).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "dropping unserializable status frame");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_absorbs_extra_signals() {
        let gates = UploadGates::new();
        let id = BuildId::random();
        let rx = gates.register(id);

        assert!(gates.signal(id));
        assert!(gates.signal(id));
        assert!(*rx.borrow());
    }

    #[test]
    fn test_signal_for_unknown_build_is_rejected() {
        let gates = UploadGates::new();
        assert!(!gates.signal(BuildId::random()));
    }

    #[test]
    fn test_gates_are_independent_per_build() {
        let gates = UploadGates::new();
        let a = gates.register(BuildId::random());
        let b_id = BuildId::random();
        let b = gates.register(b_id);

        gates.signal(b_id);
        assert!(!*a.borrow());
        assert!(*b.borrow());
    }
}
