//! Per-contract read cursors and their persistence.
//!
//! A cursor records the next block a contract's poll should start from.
//! Cursors only move forward; a stored cursor lets a restarted consumer
//! resume instead of rescanning from the origin block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::block::BlockNumber;
use crate::error::IngestError;

/// The read position of one contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub contract_address: String,
    pub next_block: BlockNumber,
}

impl Cursor {
    /// Create a cursor at the given starting block.
    pub fn new(contract_address: impl Into<String>, next_block: BlockNumber) -> Self {
        Self {
            contract_address: contract_address.into(),
            next_block,
        }
    }

    /// Move the cursor to `next_block` if that is ahead of the current
    /// position. Returns `true` if the cursor moved.
    pub fn advance_to(&mut self, next_block: BlockNumber) -> bool {
        if next_block > self.next_block {
            self.next_block = next_block;
            true
        } else {
            false
        }
    }
}

/// Storage for cursors, keyed by contract address.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self, contract_address: &str) -> Result<Option<Cursor>, IngestError>;

    /// Save (upsert) a cursor.
    async fn save(&self, cursor: &Cursor) -> Result<(), IngestError>;
}

fn key(address: &str) -> String {
    address.to_ascii_lowercase()
}

// ─── In-memory store ──────────────────────────────────────────────────────────

/// In-memory cursor store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCursorStore {
    data: Mutex<HashMap<String, Cursor>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Cursor>>, IngestError> {
        self.data
            .lock()
            .map_err(|e| IngestError::Storage(format!("cursor store poisoned: {e}")))
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, contract_address: &str) -> Result<Option<Cursor>, IngestError> {
        Ok(self.lock()?.get(&key(contract_address)).cloned())
    }

    async fn save(&self, cursor: &Cursor) -> Result<(), IngestError> {
        self.lock()?
            .insert(key(&cursor.contract_address), cursor.clone());
        Ok(())
    }
}

// ─── JSON file store ──────────────────────────────────────────────────────────

/// On-disk record of one cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCursor {
    next_block: BlockNumber,
    /// Unix timestamp of the last save.
    updated_at: i64,
}

/// Persists every cursor into a single JSON object keyed by address.
///
/// Writes go to a temporary file first and are then renamed over the target.
pub struct FileCursorStore {
    path: PathBuf,
    cache: tokio::sync::Mutex<Option<HashMap<String, StoredCursor>>>,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    async fn read_file(&self) -> Result<HashMap<String, StoredCursor>, IngestError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                IngestError::Storage(format!("corrupt cursor file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(IngestError::Storage(format!(
                "reading {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self, contract_address: &str) -> Result<Option<Cursor>, IngestError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_file().await?);
        }
        Ok(cache
            .as_ref()
            .and_then(|m| m.get(&key(contract_address)))
            .map(|c| Cursor::new(contract_address, c.next_block)))
    }

    async fn save(&self, cursor: &Cursor) -> Result<(), IngestError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_file().await?);
        }
        let map = cache.get_or_insert_with(HashMap::new);
        map.insert(
            key(&cursor.contract_address),
            StoredCursor {
                next_block: cursor.next_block,
                updated_at: chrono::Utc::now().timestamp(),
            },
        );

        let body = serde_json::to_vec_pretty(&*map)
            .map_err(|e| IngestError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| IngestError::Storage(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| IngestError::Storage(format!("renaming {}: {e}", tmp.display())))?;
        Ok(())
    }
}
