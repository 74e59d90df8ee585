//! The scheduler's handle on a queued-or-executing job.

use std::sync::Arc;

use parking_lot::Mutex;
use quarry_api::{JobResult, JobSpec};
use tokio::sync::watch;

/// A job that has been scheduled but whose result may not have arrived
/// yet. Carries a one-shot completion latch and a write-once result
/// slot; the result is written before the latch fires.
pub struct PendingJob {
    pub spec: JobSpec,
    result: Mutex<Option<JobResult>>,
    done: watch::Sender<bool>,
}

impl PendingJob {
    pub(crate) fn new(spec: JobSpec) -> Arc<Self> {
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            spec,
            result: Mutex::new(None),
            done,
        })
    }

    /// Whether the completion latch has fired.
    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Stores the result and fires the latch. Returns false if the job
    /// was already finished, leaving the first result in place. The
    /// scheduler serializes calls under its registry lock.
    pub(crate) fn finish(&self, result: JobResult) -> bool {
        if self.is_finished() {
            return false;
        }
        *self.result.lock() = Some(result);
        self.done.send_replace(true);
        true
    }

    /// Waits until the job finishes. Resolves immediately if it
    /// already has; safe to call from any number of waiters.
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives inside self, so wait_for cannot fail.
        let _ = rx.wait_for(|finished| *finished).await;
    }

    /// The result, once [`is_finished`](Self::is_finished) holds.
    pub fn result(&self) -> Option<JobResult> {
        self.result.lock().clone()
    }
}
