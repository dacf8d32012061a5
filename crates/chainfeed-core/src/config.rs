//! Consumer configuration.
//!
//! Loaded from a YAML file; every field has a default so a minimal file only
//! needs `rpc_url` and `registry_address`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::block::BlockNumber;
use crate::error::IngestError;
use crate::logging::LogConfig;

/// First block scanned for contracts deployed on mainnet.
pub const PRODUCTION_ORIGIN_BLOCK: BlockNumber = BlockNumber(0x41736a);

/// Known-broken tagger testnet deployments.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "0x2b88b7c1f40cbd59344e739edbb9c5630af2bbcb",
    "0x045f938bd53f87d745938fdb7c36af3a228494b7",
    "0xac1131decdc72bec9cda8ba4a039fd8be40221a0",
    "0xebf4978fda445ec749994bb6e23742198c67f942",
    "0x844b6ee37358ba42918eb4dac63df25e06d8fbdd",
];

/// Contract families tracked by default.
pub const DEFAULT_FAMILIES: &[&str] = &["peerreview", "auctioneer", "tagger"];

/// HTTP retry settings for the JSON-RPC transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_retries() -> u32 { 2 }
fn default_initial_backoff_ms() -> u64 { 250 }
fn default_max_backoff_ms() -> u64 { 2_000 }

/// Where the `SuccessfulBidRange` handler takes the bidder address from.
///
/// In YAML: `{ source: tx_sender }` or `{ source: event_field, field: bidder }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "field", rename_all = "snake_case")]
pub enum BidderSource {
    /// The address recorded for the transaction by the content API.
    #[default]
    TxSender,
    /// A named field of the decoded event.
    EventField(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulBidRangeSettings {
    #[serde(default)]
    pub bidder: BidderSource,
}

/// Per-handler settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    #[serde(default)]
    pub successful_bid_range: SuccessfulBidRangeSettings,
}

/// Top-level configuration of the event consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// JSON-RPC endpoint used for `eth_getLogs` and registry calls.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Address of the on-chain registry (router) contract.
    #[serde(default)]
    pub registry_address: Option<String>,
    #[serde(default = "default_families")]
    pub families: Vec<String>,
    /// Addresses never tracked regardless of registry contents.
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
    /// Block each cursor starts from when nothing is stored.
    #[serde(default)]
    pub origin_block: BlockNumber,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timeout for fetching one interface descriptor.
    #[serde(default = "default_descriptor_timeout_ms")]
    pub descriptor_timeout_ms: u64,
    /// IPFS HTTP API base URL.
    #[serde(default = "default_ipfs_url")]
    pub ipfs_url: String,
    /// Persist cursors to this JSON file when set.
    #[serde(default)]
    pub cursor_file: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub handlers: HandlerSettings,
}

fn default_rpc_url() -> String { "http://127.0.0.1:8545".into() }
fn default_families() -> Vec<String> { DEFAULT_FAMILIES.iter().map(|s| s.to_string()).collect() }
fn default_denylist() -> Vec<String> { DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect() }
fn default_poll_interval_ms() -> u64 { 10_000 }
fn default_descriptor_timeout_ms() -> u64 { 30_000 }
fn default_ipfs_url() -> String { "http://127.0.0.1:5001".into() }

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            registry_address: None,
            families: default_families(),
            denylist: default_denylist(),
            origin_block: BlockNumber::ZERO,
            poll_interval_ms: default_poll_interval_ms(),
            descriptor_timeout_ms: default_descriptor_timeout_ms(),
            ipfs_url: default_ipfs_url(),
            cursor_file: None,
            retry: RetrySettings::default(),
            log: LogConfig::default(),
            handlers: HandlerSettings::default(),
        }
    }
}

impl ConsumerConfig {
    /// Parse a YAML document.
    pub fn from_yaml(s: &str) -> Result<Self, IngestError> {
        serde_yaml::from_str(s).map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| IngestError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_yaml(&body)
    }

    /// Check the values that have no sensible fallback.
    pub fn validate(&self) -> Result<(), IngestError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(IngestError::Config(format!(
                "rpc_url must start with http:// or https://, got: {}",
                self.rpc_url
            )));
        }
        if let Some(addr) = &self.registry_address {
            if !addr.starts_with("0x") || addr.len() != 42 {
                return Err(IngestError::Config(format!(
                    "registry_address must be a 20-byte hex address, got: {addr}"
                )));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(IngestError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.families.is_empty() {
            return Err(IngestError::Config("at least one contract family is required".into()));
        }
        Ok(())
    }
}
