//! Error types for descriptor parsing and log decoding.

use thiserror::Error;

use chainfeed_core::IngestError;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The descriptor blob is not a JSON ABI (or an artifact wrapping one).
    #[error("Invalid interface descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    #[error("Invalid raw log: {reason}")]
    InvalidRawLog { reason: String },

    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A selector matched, but no registered layout for it has this many
    /// indexed parameters.
    #[error("Event {event} expects {expected} indexed topics, log has {got}")]
    TopicCountMismatch {
        event: String,
        expected: usize,
        got: usize,
    },
}

impl From<DecodeError> for IngestError {
    fn from(e: DecodeError) -> Self {
        IngestError::Decode(e.to_string())
    }
}
