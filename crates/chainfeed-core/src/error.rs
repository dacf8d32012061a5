//! Error types for the chainfeed pipeline.

use thiserror::Error;

/// Errors that can occur while discovering contracts, polling logs or
/// dispatching jobs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery failed for family '{family}': {reason}")]
    Discovery { family: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(String),

    /// Wrong input shape handed to an internal component. Never recovered from.
    #[error("Internal contract violation: {0}")]
    ContractViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl IngestError {
    /// Returns `true` for soft failures that should simply be retried on the
    /// next poll cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Queue(_) | Self::Discovery { .. }
        )
    }

    /// Returns `true` if the error should terminate the owning task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

/// Errors reported by event handlers back to the queue's failure path.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid event for handler: expected '{expected}', got '{got}'")]
    InvalidEvent { expected: String, got: String },

    #[error("Missing field '{field}' in {event} event")]
    MissingField { event: String, field: String },

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(IngestError::Transport("HTTP 500".into()).is_transient());
        assert!(IngestError::Timeout { ms: 30_000 }.is_transient());
        assert!(!IngestError::ContractViolation("not an array".into()).is_transient());
        assert!(IngestError::ContractViolation("not an array".into()).is_fatal());
        assert!(!IngestError::Decode("bad topic".into()).is_fatal());
    }
}
