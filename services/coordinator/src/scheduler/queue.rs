//! Blocking FIFO queue of pending jobs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::pending::PendingJob;

struct QueueState {
    items: VecDeque<Arc<PendingJob>>,
    closed: bool,
}

/// FIFO of pending jobs with an async, cancel-safe take.
///
/// Close semantics: after [`close`](JobQueue::close), `put` is a silent
/// no-op; items queued before the close are still drained by takers;
/// a taker observing empty+closed resolves `None`.
pub struct JobQueue {
    state: Mutex<QueueState>,
    changed: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            changed: Notify::new(),
        }
    }

    /// Appends a job and wakes waiting takers. No-op once closed.
    pub fn put(&self, job: Arc<PendingJob>) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.items.push_back(job);
        }
        // Broadcast; takers re-check the queue, so overtaking is
        // harmless and no wakeup can strand an item.
        self.changed.notify_waiters();
    }

    /// Waits for the head item. Resolves `None` once the queue is
    /// closed and drained. Cancel-safe: dropping the future never
    /// loses an item.
    pub async fn take(&self) -> Option<Arc<PendingJob>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking, so a put or close
            // between the check and the await is not lost.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(job) = state.items.pop_front() {
                    return Some(job);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Flips the sticky closed flag and wakes every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_waiters();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quarry_api::JobSpec;
    use quarry_graph::Job;
    use quarry_id::JobId;

    use super::*;

    fn pending(tag: &[u8]) -> Arc<PendingJob> {
        PendingJob::new(JobSpec {
            job: Job {
                id: JobId::from_content(tag),
                name: String::new(),
                inputs: Vec::new(),
                deps: Vec::new(),
                cmds: Vec::new(),
            },
            source_files: Default::default(),
            artifacts: Default::default(),
        })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = JobQueue::new();
        let a = pending(b"a");
        let b = pending(b"b");
        queue.put(a.clone());
        queue.put(b.clone());

        assert_eq!(queue.take().await.unwrap().spec.job.id, a.spec.job.id);
        assert_eq!(queue.take().await.unwrap().spec.job.id, b.spec.job.id);
    }

    #[tokio::test]
    async fn test_take_blocks_until_put() {
        let queue = Arc::new(JobQueue::new());

        let taker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!taker.is_finished());

        queue.put(pending(b"late"));
        assert!(taker.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_close_wakes_waiters_with_none() {
        let queue = Arc::new(JobQueue::new());
        let taker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        assert!(taker.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_items_queued_before_close_still_drain() {
        let queue = JobQueue::new();
        queue.put(pending(b"survivor"));
        queue.close();

        assert!(queue.take().await.is_some());
        assert!(queue.take().await.is_none());
    }

    #[tokio::test]
    async fn test_put_after_close_is_noop() {
        let queue = JobQueue::new();
        queue.close();
        queue.put(pending(b"dropped"));
        assert_eq!(queue.len(), 0);
        assert!(queue.take().await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_take_loses_nothing() {
        let queue = Arc::new(JobQueue::new());

        // A take that gets cancelled while waiting.
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), queue.take()).await;
        assert!(cancelled.is_err());

        queue.put(pending(b"kept"));
        assert!(queue.take().await.is_some());
    }
}
