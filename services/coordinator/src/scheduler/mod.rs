//! Job scheduling: the pending-job registry, the work queue, and the
//! artifact-to-worker index.

mod pending;
mod queue;

pub use pending::PendingJob;
pub use queue::JobQueue;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use quarry_api::{JobResult, JobSpec};
use quarry_id::{JobId, WorkerId};
use tracing::{debug, warn};

struct Inner {
    registry: HashMap<JobId, Arc<PendingJob>>,
    artifacts: HashMap<JobId, WorkerId>,
}

/// Matches scheduled jobs to workers and tracks where artifacts live.
///
/// The registry and artifact index share one mutex, held only across
/// map operations, never across I/O or awaits.
pub struct Scheduler {
    queue: JobQueue,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            queue: JobQueue::new(),
            inner: Mutex::new(Inner {
                registry: HashMap::new(),
                artifacts: HashMap::new(),
            }),
        }
    }

    /// Schedules a job, or returns the existing pending job when the
    /// ID was already scheduled (idempotent).
    pub fn schedule_job(&self, spec: JobSpec) -> Arc<PendingJob> {
        let id = spec.job.id;
        let pending = {
            let mut inner = self.inner.lock();
            if let Some(existing) = inner.registry.get(&id) {
                debug!(job = %id, "job already scheduled");
                return Arc::clone(existing);
            }
            let pending = PendingJob::new(spec);
            inner.registry.insert(id, Arc::clone(&pending));
            pending
        };

        debug!(job = %id, "job queued");
        self.queue.put(Arc::clone(&pending));
        pending
    }

    /// Waits for a job and claims it for `worker`, recording the
    /// worker as the authority for the job's artifact. Resolves `None`
    /// once the scheduler stops. Cancel-safe: an abandoned pick claims
    /// no job and writes no index entry.
    pub async fn pick_job(&self, worker: &WorkerId) -> Option<Arc<PendingJob>> {
        let job = self.queue.take().await?;
        let id = job.spec.job.id;
        self.inner.lock().artifacts.insert(id, worker.clone());
        debug!(job = %id, worker = %worker, "job picked");
        Some(job)
    }

    /// Records a finished job's result and fires its completion latch.
    /// Duplicate completions are idempotent no-ops; only the first
    /// result is observable.
    pub fn on_job_complete(&self, worker: &WorkerId, job_id: JobId, result: JobResult) {
        let inner = self.inner.lock();
        let Some(pending) = inner.registry.get(&job_id) else {
            warn!(job = %job_id, worker = %worker, "completion for unknown job");
            return;
        };
        if pending.finish(result) {
            debug!(job = %job_id, worker = %worker, "job complete");
        } else {
            debug!(job = %job_id, worker = %worker, "duplicate completion ignored");
        }
    }

    /// Registers an artifact a worker reports holding, unless some
    /// worker already owns it.
    pub fn register_artifact(&self, id: JobId, worker: &WorkerId) {
        self.inner
            .lock()
            .artifacts
            .entry(id)
            .or_insert_with(|| worker.clone());
    }

    /// The worker holding `id`'s artifact, if any.
    pub fn locate_artifact(&self, id: JobId) -> Option<WorkerId> {
        self.inner.lock().artifacts.get(&id).cloned()
    }

    /// Closes the queue, releasing every blocked picker.
    pub fn stop(&self) {
        self.queue.close();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
