//! Decoder & dispatcher: raw log batch → jobs on the work queue.

use std::sync::Arc;

use chainfeed_abi::DecodeTable;
use chainfeed_core::{BlockNumber, IngestError, Job, PutAck, RawLogEntry, TrackedEvent, WorkQueue};
use serde_json::Value;

/// Summary of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Highest block among decoded entries. `None` if nothing decoded.
    pub highest_block: Option<BlockNumber>,
    /// Entries that decoded against a registered interface.
    pub decoded: usize,
    /// Jobs newly accepted by the queue.
    pub submitted: usize,
    /// Jobs the queue already held under the same key.
    pub duplicates: usize,
    /// Entries that failed to parse or decode.
    pub failed: usize,
}

pub struct Dispatcher {
    table: DecodeTable,
    queue: Arc<dyn WorkQueue>,
}

impl Dispatcher {
    pub fn new(table: DecodeTable, queue: Arc<dyn WorkQueue>) -> Self {
        Self { table, queue }
    }

    /// Decode a batch and queue a job per tracked event.
    ///
    /// `None` input yields `Ok(None)`. Input that is not a JSON array is a
    /// [`IngestError::ContractViolation`]. Individual entries that fail to
    /// decode are logged and skipped; a queue failure aborts the batch so the
    /// caller leaves its cursor where it was.
    pub async fn process(&self, logs: Option<&Value>) -> Result<Option<DispatchOutcome>, IngestError> {
        let Some(logs) = logs else { return Ok(None) };
        let entries = logs.as_array().ok_or_else(|| {
            IngestError::ContractViolation(format!("logs given to dispatcher are not an array: {logs}"))
        })?;

        tracing::debug!(count = entries.len(), "processing logs");
        let mut outcome = DispatchOutcome::default();

        for entry in entries {
            let raw: RawLogEntry = match serde_json::from_value(entry.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(error = %e, log = %entry, "malformed log entry");
                    continue;
                }
            };

            let decoded = match self.table.decode(&raw) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => continue,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(error = %e, log = %entry, "error decoding log");
                    continue;
                }
            };
            let name = decoded.name.clone();
            let tracked = match TrackedEvent::from_decoded(decoded) {
                Ok(tracked) => tracked,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(error = %e, log = %entry, "decoded event does not fit its type");
                    continue;
                }
            };
            // untracked events still move the cursor past their block
            outcome.decoded += 1;
            outcome.highest_block = outcome.highest_block.max(Some(raw.block_number));

            let Some(event) = tracked else {
                tracing::debug!(event = %name, tx_hash = %raw.transaction_hash, "untracked event, skipping");
                continue;
            };

            let job = Job::new(&raw, event);
            let key = job.idempotency_key.clone();
            match self.queue.put(job).await? {
                PutAck::Queued => {
                    outcome.submitted += 1;
                    tracing::debug!(key = %key, block = %raw.block_number, "job queued");
                }
                PutAck::Duplicate => {
                    outcome.duplicates += 1;
                    tracing::debug!(key = %key, "job already queued");
                }
            }
        }

        if outcome.decoded == 0 && !entries.is_empty() {
            tracing::warn!(count = entries.len(), "no events decoded from non-empty batch");
        }

        Ok(Some(outcome))
    }
}
