//! Shared types for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::block::BlockNumber;

// ─── Contract instances ───────────────────────────────────────────────────────

/// A deployed contract as listed by the on-chain registry, before its
/// interface descriptor has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Contract family the registry listed it under (e.g. `"tagger"`).
    pub family: String,
    /// Contract address (`0x…`).
    pub address: String,
    /// Content hash of the interface descriptor blob.
    pub descriptor_hash: String,
}

/// A tracked contract with its interface descriptor loaded.
///
/// Immutable once resolved; owned by the poll task for its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInstance {
    pub family: String,
    pub address: String,
    /// Raw interface descriptor bytes (a JSON ABI document).
    pub descriptor: Vec<u8>,
}

// ─── RawLogEntry ──────────────────────────────────────────────────────────────

/// A raw, undecoded log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEntry {
    pub address: String,
    pub block_number: BlockNumber,
    pub transaction_hash: String,
    /// Hex-encoded log index within the block.
    pub log_index: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Hex-encoded non-indexed event data.
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
}

impl RawLogEntry {
    /// Returns the log index as u32 (`0` if malformed).
    pub fn log_index_u32(&self) -> u32 {
        let s = self.log_index.strip_prefix("0x").unwrap_or(&self.log_index);
        u32::from_str_radix(s, 16).unwrap_or(0)
    }

    /// `topics[0]`, the event selector, if present.
    pub fn selector(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }
}

// ─── Decoded values ───────────────────────────────────────────────────────────

/// A decoded, normalized ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NormalizedValue {
    Uint(u128),
    /// Large uints (> u128) stored as decimal string
    BigUint(String),
    Int(i128),
    /// Large ints (> i128) stored as decimal string
    BigInt(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// 20-byte address, hex with 0x prefix
    Address(String),
    Array(Vec<NormalizedValue>),
    Tuple(Vec<(String, NormalizedValue)>),
    Null,
}

impl NormalizedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NormalizedValue::Null)
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            NormalizedValue::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            NormalizedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Uint(v) => write!(f, "{v}"),
            NormalizedValue::BigUint(v) => write!(f, "{v}"),
            NormalizedValue::Int(v) => write!(f, "{v}"),
            NormalizedValue::BigInt(v) => write!(f, "{v}"),
            NormalizedValue::Bool(v) => write!(f, "{v}"),
            NormalizedValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            NormalizedValue::Str(s) => write!(f, "{s}"),
            NormalizedValue::Address(a) => write!(f, "{a}"),
            NormalizedValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            NormalizedValue::Tuple(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            NormalizedValue::Null => write!(f, "null"),
        }
    }
}

/// An event decoded against a registered interface descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Event name from the interface descriptor (e.g. `"Tagged"`).
    pub name: String,
    /// Field values keyed by parameter name.
    pub fields: BTreeMap<String, NormalizedValue>,
}

impl DecodedEvent {
    pub fn field(&self, name: &str) -> Option<&NormalizedValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_log_from_rpc_json() {
        let log: RawLogEntry = serde_json::from_value(json!({
            "address": "0xabc0000000000000000000000000000000000001",
            "blockNumber": "0x41736b",
            "transactionHash": "0xdead",
            "logIndex": "0x3",
            "topics": ["0x01"],
            "data": "0x",
            "blockHash": "0xbeef",
            "removed": false
        }))
        .unwrap();
        assert_eq!(log.block_number, BlockNumber(0x41736b));
        assert_eq!(log.log_index_u32(), 3);
        assert_eq!(log.selector(), Some("0x01"));
    }

    #[test]
    fn raw_log_rejects_missing_tx_hash() {
        let res: Result<RawLogEntry, _> = serde_json::from_value(json!({
            "address": "0x1",
            "blockNumber": "0x1",
            "logIndex": "0x0"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn value_display() {
        assert_eq!(NormalizedValue::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
        assert_eq!(
            NormalizedValue::Array(vec![NormalizedValue::Uint(1), NormalizedValue::Bool(false)])
                .to_string(),
            "[1, false]"
        );
    }
}
