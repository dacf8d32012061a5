//! Job handler traits + registry.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::event::TrackedEvent;
use crate::job::Job;

/// Progress sink for a job being handled (0–100).
pub trait JobProgress: Send + Sync {
    fn report(&self, percent: u8);
}

/// Discards progress reports.
pub struct NoProgress;

impl JobProgress for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Logs progress reports at debug level.
pub struct TracingProgress {
    key: String,
}

impl TracingProgress {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl JobProgress for TracingProgress {
    fn report(&self, percent: u8) {
        tracing::debug!(job = %self.key, percent = percent.min(100), "job progress");
    }
}

/// A consumer of queue jobs for one event type.
///
/// Jobs may be redelivered, so `handle` must be idempotent with respect to
/// the job's transaction hash.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The event name this handler processes (e.g. `"SuccessfulBidRange"`).
    fn event_name(&self) -> &str;

    async fn handle(&self, job: &Job, progress: &dyn JobProgress) -> Result<(), HandlerError>;
}

/// Reject jobs whose event does not match the handler.
pub fn ensure_event(job: &Job, expected: &str) -> Result<(), HandlerError> {
    let got = job.event_name();
    if got == expected {
        Ok(())
    } else {
        Err(HandlerError::InvalidEvent {
            expected: expected.to_string(),
            got: got.to_string(),
        })
    }
}

/// One handler per tracked event type.
///
/// Routing is an exhaustive match on [`TrackedEvent`], so a new event variant
/// does not compile until it has a handler slot here.
pub struct HandlerRegistry {
    tagged: Arc<dyn JobHandler>,
    successful_bid_range: Arc<dyn JobHandler>,
}

impl HandlerRegistry {
    pub fn new(tagged: Arc<dyn JobHandler>, successful_bid_range: Arc<dyn JobHandler>) -> Self {
        Self { tagged, successful_bid_range }
    }

    /// The handler responsible for `event`.
    pub fn handler_for(&self, event: &TrackedEvent) -> &Arc<dyn JobHandler> {
        match event {
            TrackedEvent::Tagged(_) => &self.tagged,
            TrackedEvent::SuccessfulBidRange(_) => &self.successful_bid_range,
        }
    }

    pub async fn dispatch(&self, job: &Job, progress: &dyn JobProgress) -> Result<(), HandlerError> {
        self.handler_for(&job.payload.event).handle(job, progress).await
    }
}
