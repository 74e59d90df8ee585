//! The worker's long-running heartbeat loop.

use quarry_api::{HeartbeatRequest, JobResult};
use quarry_cache::{ArtifactCache, FileCache};
use quarry_id::{JobId, WorkerId};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::heartbeat::HeartbeatClient;
use crate::job::Executor;

/// A worker: one heartbeat loop feeding one executor.
pub struct Worker {
    worker_id: WorkerId,
    config: Config,
    heartbeat: HeartbeatClient,
    executor: Executor,
}

impl Worker {
    pub fn new(config: Config, file_cache: FileCache, artifacts: ArtifactCache) -> Self {
        let worker_id = WorkerId::new(config.public_endpoint.clone());
        let heartbeat = HeartbeatClient::new(&config.coordinator_url);
        let executor = Executor::new(&config.coordinator_url, file_cache, artifacts);
        Self {
            worker_id,
            config,
            heartbeat,
            executor,
        }
    }

    /// The worker's identity, as advertised to the coordinator.
    pub fn id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Runs the heartbeat loop indefinitely. Transport errors are
    /// retried after the poll interval; accumulated results are kept
    /// for the next successful beat.
    pub async fn run(&self) {
        info!(
            worker = %self.worker_id,
            coordinator = %self.config.coordinator_url,
            "Starting worker loop"
        );

        let mut finished: Vec<JobResult> = Vec::new();
        let mut added: Vec<JobId> = Vec::new();
        let mut consecutive_failures = 0u32;

        loop {
            let request = HeartbeatRequest {
                worker_id: self.worker_id.clone(),
                free_slots: 1,
                finished_jobs: std::mem::take(&mut finished),
                added_artifacts: std::mem::take(&mut added),
            };

            match self.heartbeat.heartbeat(&request).await {
                Ok(response) => {
                    consecutive_failures = 0;
                    let idle = response.jobs_to_run.is_empty();

                    for (job_id, spec) in response.jobs_to_run {
                        info!(job = %job_id, name = %spec.job.name, "job assigned");
                        let (result, committed) = self.executor.run_job(&spec).await;
                        if committed {
                            added.push(job_id);
                        }
                        debug!(job = %job_id, exit_code = result.exit_code, "job done");
                        finished.push(result);
                    }

                    if idle {
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures <= 3 {
                        warn!(error = %e, consecutive_failures, "Heartbeat failed");
                    } else {
                        error!(error = %e, consecutive_failures, "Heartbeat failed repeatedly");
                    }
                    // Nothing was delivered; report it on the next beat.
                    finished = request.finished_jobs;
                    added = request.added_artifacts;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }
}
