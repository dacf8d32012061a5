//! Handler for `Auctioneer.SuccessfulBidRange`.

use std::sync::Arc;

use async_trait::async_trait;
use chainfeed_core::event::SuccessfulBidRange;
use chainfeed_core::handler::ensure_event;
use chainfeed_core::{BidderSource, HandlerError, Job, JobHandler, JobProgress, TrackedEvent};
use serde_json::json;

use crate::sink::{ContentSink, TxType};

const EVENT: &str = "SuccessfulBidRange";

/// Notifies the bidding user and completes the pending bid transaction.
///
/// The user is looked up by transaction hash; where the notification's
/// `bidder` comes from is configured by [`BidderSource`].
pub struct SuccessfulBidRangeHandler {
    sink: Arc<dyn ContentSink>,
    bidder: BidderSource,
}

impl SuccessfulBidRangeHandler {
    pub fn new(sink: Arc<dyn ContentSink>, bidder: BidderSource) -> Self {
        Self { sink, bidder }
    }

    fn bidder(&self, user: &str, ev: &SuccessfulBidRange) -> Result<String, HandlerError> {
        match &self.bidder {
            BidderSource::TxSender => Ok(user.to_string()),
            BidderSource::EventField(field) => ev
                .extra
                .get(field)
                .map(|v| v.to_string())
                .ok_or_else(|| HandlerError::MissingField {
                    event: EVENT.into(),
                    field: field.clone(),
                }),
        }
    }
}

#[async_trait]
impl JobHandler for SuccessfulBidRangeHandler {
    fn event_name(&self) -> &str {
        EVENT
    }

    async fn handle(&self, job: &Job, progress: &dyn JobProgress) -> Result<(), HandlerError> {
        progress.report(1);
        ensure_event(job, EVENT)?;
        let TrackedEvent::SuccessfulBidRange(ev) = &job.payload.event else {
            return Err(HandlerError::InvalidEvent {
                expected: EVENT.into(),
                got: job.event_name().into(),
            });
        };
        let tx_hash = &job.payload.tx_hash;

        if self.sink.is_completed(tx_hash, TxType::Bid).await? {
            tracing::debug!(tx_hash = %tx_hash, "bid transaction already complete");
            progress.report(100);
            return Ok(());
        }
        progress.report(10);

        tracing::debug!(tx_hash = %tx_hash, "looking up user address");
        match self.sink.address_by_tx(tx_hash).await? {
            Some(user) => {
                let data = json!({
                    "bidder": self.bidder(&user, ev)?,
                    "scope": ev.scope.to_string(),
                    "timePeriodStart": ev.time_period_start.to_string(),
                    "range": ev.range.to_string(),
                    "lunAmount": ev.lun_amount.to_string(),
                });
                self.sink.add_notification(&user, EVENT, data).await?;
            }
            None => tracing::debug!(tx_hash = %tx_hash, "no user recorded for transaction"),
        }
        progress.report(50);

        self.sink.complete_transaction(tx_hash, TxType::Bid).await?;
        progress.report(100);
        Ok(())
    }
}
