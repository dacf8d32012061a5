//! Handler for `Tagger.Tagged`.

use std::sync::Arc;

use async_trait::async_trait;
use chainfeed_core::handler::ensure_event;
use chainfeed_core::{HandlerError, Job, JobHandler, JobProgress, TrackedEvent};

use crate::sink::{ContentSink, TxType};

pub struct TaggedHandler {
    sink: Arc<dyn ContentSink>,
}

impl TaggedHandler {
    pub fn new(sink: Arc<dyn ContentSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl JobHandler for TaggedHandler {
    fn event_name(&self) -> &str {
        "Tagged"
    }

    async fn handle(&self, job: &Job, progress: &dyn JobProgress) -> Result<(), HandlerError> {
        progress.report(1);
        ensure_event(job, "Tagged")?;
        let TrackedEvent::Tagged(ev) = &job.payload.event else {
            return Err(HandlerError::InvalidEvent {
                expected: "Tagged".into(),
                got: job.event_name().into(),
            });
        };
        let tx_hash = &job.payload.tx_hash;

        if self.sink.is_completed(tx_hash, TxType::Tag).await? {
            tracing::debug!(tx_hash = %tx_hash, "tag transaction already complete");
            progress.report(100);
            return Ok(());
        }
        progress.report(10);

        self.sink
            .associate_tag(
                tx_hash,
                &ev.tagger.to_string(),
                &ev.tag.to_string(),
                &ev.target.to_string(),
            )
            .await?;
        progress.report(50);

        self.sink.complete_transaction(tx_hash, TxType::Tag).await?;
        progress.report(100);
        Ok(())
    }
}
