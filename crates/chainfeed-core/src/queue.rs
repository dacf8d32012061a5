//! Work queue abstraction.
//!
//! The production queue is an external at-least-once service; the pipeline
//! only needs `put`. [`MemoryQueue`] backs tests and single-process runs.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::error::IngestError;
use crate::job::Job;

/// Acknowledgement returned by [`WorkQueue::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutAck {
    /// The job was enqueued.
    Queued,
    /// A job with the same idempotency key was already accepted.
    Duplicate,
}

/// A durable keyed queue the dispatcher submits jobs to.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Submit a job under its idempotency key.
    async fn put(&self, job: Job) -> Result<PutAck, IngestError>;
}

// ─── In-memory queue ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    pending: VecDeque<Job>,
    seen: HashSet<String>,
}

/// In-process FIFO queue that drops resubmissions of an already-seen key.
///
/// Seen keys are kept for the lifetime of the queue and never evicted, so
/// memory grows with every distinct job. Suited to tests and single runs.
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest pending job, if any.
    pub fn try_next(&self) -> Option<Job> {
        self.lock().pending.pop_front()
    }

    /// Wait until a job is available and pop it.
    pub async fn next(&self) -> Job {
        loop {
            let notified = self.notify.notified();
            if let Some(job) = self.try_next() {
                return job;
            }
            notified.await;
        }
    }

    /// Number of jobs waiting to be taken.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of pending jobs, oldest first.
    pub fn pending(&self) -> Vec<Job> {
        self.lock().pending.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-push; the
        // queue contents are still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn put(&self, job: Job) -> Result<PutAck, IngestError> {
        {
            let mut inner = self.lock();
            if !inner.seen.insert(job.idempotency_key.clone()) {
                return Ok(PutAck::Duplicate);
            }
            inner.pending.push_back(job);
        }
        self.notify.notify_one();
        Ok(PutAck::Queued)
    }
}
