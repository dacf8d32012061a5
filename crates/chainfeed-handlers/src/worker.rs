//! Job worker: drains the queue into the handler registry.

use std::sync::Arc;

use chainfeed_core::handler::TracingProgress;
use chainfeed_core::{HandlerRegistry, Job, MemoryQueue};
use tokio_util::sync::CancellationToken;

/// What happened to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
}

/// Running totals, per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: usize,
    pub failed: usize,
}

impl WorkerStats {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed += 1,
            JobOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct JobWorker {
    queue: Arc<MemoryQueue>,
    handlers: Arc<HandlerRegistry>,
}

impl JobWorker {
    pub fn new(queue: Arc<MemoryQueue>, handlers: Arc<HandlerRegistry>) -> Self {
        Self { queue, handlers }
    }

    /// Run one job through its handler. Handler errors are reported here,
    /// against the job key.
    pub async fn process(&self, job: &Job) -> JobOutcome {
        let progress = TracingProgress::new(job.idempotency_key.clone());
        match self.handlers.dispatch(job, &progress).await {
            Ok(()) => {
                tracing::debug!(job = %job.idempotency_key, "job complete");
                JobOutcome::Completed
            }
            Err(e) => {
                tracing::error!(
                    job = %job.idempotency_key,
                    tx_hash = %job.payload.tx_hash,
                    error = %e,
                    "job failed"
                );
                JobOutcome::Failed
            }
        }
    }

    /// Process everything currently queued, then return.
    pub async fn drain(&self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        while let Some(job) = self.queue.try_next() {
            stats.record(self.process(&job).await);
        }
        stats
    }

    /// Process jobs as they arrive until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> WorkerStats {
        let mut stats = WorkerStats::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.queue.next() => stats.record(self.process(&job).await),
            }
        }
        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            "job worker stopped"
        );
        stats
    }
}
