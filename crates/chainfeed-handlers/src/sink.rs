//! The content API as seen by handlers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chainfeed_core::HandlerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of pending transaction a handler completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Bid,
    Tag,
}

/// Side effects available to handlers. Every call is keyed by transaction
/// hash so redelivered jobs can be recognised.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// The user address the content API recorded for `tx_hash`, if any.
    async fn address_by_tx(&self, tx_hash: &str) -> Result<Option<String>, HandlerError>;

    async fn add_notification(&self, user: &str, kind: &str, data: Value) -> Result<(), HandlerError>;

    async fn associate_tag(
        &self,
        tx_hash: &str,
        tagger: &str,
        tag: &str,
        target: &str,
    ) -> Result<(), HandlerError>;

    async fn complete_transaction(&self, tx_hash: &str, kind: TxType) -> Result<(), HandlerError>;

    /// Whether `complete_transaction(tx_hash, kind)` already happened.
    async fn is_completed(&self, tx_hash: &str, kind: TxType) -> Result<bool, HandlerError>;
}

/// Logs every call and remembers completions. Used when no content API is
/// wired up.
#[derive(Default)]
pub struct LoggingSink {
    completed: Mutex<HashSet<(String, TxType)>>,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentSink for LoggingSink {
    async fn address_by_tx(&self, tx_hash: &str) -> Result<Option<String>, HandlerError> {
        tracing::debug!(tx_hash, "address lookup (no content API)");
        Ok(None)
    }

    async fn add_notification(&self, user: &str, kind: &str, data: Value) -> Result<(), HandlerError> {
        tracing::info!(user, kind, data = %data, "notification");
        Ok(())
    }

    async fn associate_tag(
        &self,
        tx_hash: &str,
        tagger: &str,
        tag: &str,
        target: &str,
    ) -> Result<(), HandlerError> {
        tracing::info!(tx_hash, tagger, tag, target, "tag associated");
        Ok(())
    }

    async fn complete_transaction(&self, tx_hash: &str, kind: TxType) -> Result<(), HandlerError> {
        tracing::info!(tx_hash, kind = ?kind, "transaction complete");
        self.completed
            .lock()
            .map_err(|e| HandlerError::Sink(e.to_string()))?
            .insert((tx_hash.to_string(), kind));
        Ok(())
    }

    async fn is_completed(&self, tx_hash: &str, kind: TxType) -> Result<bool, HandlerError> {
        Ok(self
            .completed
            .lock()
            .map_err(|e| HandlerError::Sink(e.to_string()))?
            .contains(&(tx_hash.to_string(), kind)))
    }
}

/// A call made against [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Notification { user: String, kind: String, data: Value },
    Tag { tx_hash: String, tagger: String, tag: String, target: String },
    Complete { tx_hash: String, kind: TxType },
}

/// In-memory sink that records calls, for tests and dry runs.
#[derive(Default)]
pub struct RecordingSink {
    users: HashMap<String, String>,
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `address_by_tx(tx_hash)` with `user`.
    pub fn with_user(mut self, tx_hash: &str, user: &str) -> Self {
        self.users.insert(tx_hash.to_string(), user.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: SinkCall) -> Result<(), HandlerError> {
        self.calls
            .lock()
            .map_err(|e| HandlerError::Sink(e.to_string()))?
            .push(call);
        Ok(())
    }
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn address_by_tx(&self, tx_hash: &str) -> Result<Option<String>, HandlerError> {
        Ok(self.users.get(tx_hash).cloned())
    }

    async fn add_notification(&self, user: &str, kind: &str, data: Value) -> Result<(), HandlerError> {
        self.record(SinkCall::Notification {
            user: user.to_string(),
            kind: kind.to_string(),
            data,
        })
    }

    async fn associate_tag(
        &self,
        tx_hash: &str,
        tagger: &str,
        tag: &str,
        target: &str,
    ) -> Result<(), HandlerError> {
        self.record(SinkCall::Tag {
            tx_hash: tx_hash.to_string(),
            tagger: tagger.to_string(),
            tag: tag.to_string(),
            target: target.to_string(),
        })
    }

    async fn complete_transaction(&self, tx_hash: &str, kind: TxType) -> Result<(), HandlerError> {
        self.record(SinkCall::Complete { tx_hash: tx_hash.to_string(), kind })
    }

    async fn is_completed(&self, tx_hash: &str, kind: TxType) -> Result<bool, HandlerError> {
        Ok(self.calls().iter().any(|c| {
            matches!(c, SinkCall::Complete { tx_hash: t, kind: k } if t == tx_hash && *k == kind)
        }))
    }
}
