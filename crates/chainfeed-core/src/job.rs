//! Units of work handed to the queue.

use serde::{Deserialize, Serialize};

use crate::block::BlockNumber;
use crate::event::TrackedEvent;
use crate::types::RawLogEntry;

/// Everything a handler needs to process one event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub tx_hash: String,
    pub log_index: String,
    pub block_number: BlockNumber,
    /// Address of the contract that emitted the event.
    pub address: String,
    pub event: TrackedEvent,
}

/// A job keyed for deduplication by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub idempotency_key: String,
    pub payload: JobPayload,
}

impl Job {
    /// Build a job for a decoded log entry.
    pub fn new(log: &RawLogEntry, event: TrackedEvent) -> Self {
        Self {
            idempotency_key: idempotency_key(event.name(), &log.transaction_hash),
            payload: JobPayload {
                tx_hash: log.transaction_hash.clone(),
                log_index: log.log_index.clone(),
                block_number: log.block_number,
                address: log.address.clone(),
                event,
            },
        }
    }

    pub fn event_name(&self) -> &'static str {
        self.payload.event.name()
    }
}

/// `eventName:transactionHash`.
pub fn idempotency_key(event_name: &str, tx_hash: &str) -> String {
    format!("{event_name}:{tx_hash}")
}
