//! chainfeed-handlers: one handler per tracked event, plus the worker that
//! feeds them from the queue.

pub mod bid_range;
pub mod sink;
pub mod tagged;
pub mod worker;

use std::sync::Arc;

use chainfeed_core::config::HandlerSettings;
use chainfeed_core::HandlerRegistry;

pub use bid_range::SuccessfulBidRangeHandler;
pub use sink::{ContentSink, LoggingSink, RecordingSink, SinkCall, TxType};
pub use tagged::TaggedHandler;
pub use worker::{JobOutcome, JobWorker, WorkerStats};

/// A registry with a handler for every tracked event.
pub fn default_registry(sink: Arc<dyn ContentSink>, settings: &HandlerSettings) -> HandlerRegistry {
    HandlerRegistry::new(
        Arc::new(TaggedHandler::new(Arc::clone(&sink))),
        Arc::new(SuccessfulBidRangeHandler::new(
            sink,
            settings.successful_bid_range.bidder.clone(),
        )),
    )
}
