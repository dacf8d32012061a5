//! On-chain registry (router) client.
//!
//! The router lists deployed contracts per family:
//! `getTargetCount(string) -> uint256` and
//! `getIdx(string, uint256) -> (address, string)`, the second value being the
//! content hash of the interface descriptor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;
use chainfeed_abi::call::{decode_output, encode_call};
use chainfeed_abi::{DynSolType, DynSolValue};
use chainfeed_core::{IngestError, TargetRecord};
use chainfeed_rpc::{JsonRpcRequest, RpcTransport};

use crate::error::from_transport;

const GET_TARGET_COUNT: &str = "getTargetCount(string)";
const GET_IDX: &str = "getIdx(string,uint256)";

/// Read-only view of the contract registry.
#[async_trait]
pub trait ContractRegistry: Send + Sync {
    /// Number of deployed instances listed for `family`.
    async fn target_count(&self, family: &str) -> Result<u64, IngestError>;

    /// The `index`-th instance listed for `family`.
    async fn target_at(&self, family: &str, index: u64) -> Result<TargetRecord, IngestError>;

    /// Human-readable location of the registry, for diagnostics.
    fn describe(&self) -> String;
}

/// Registry contract queried through `eth_call`.
pub struct RouterRegistry {
    transport: Arc<dyn RpcTransport>,
    address: String,
    next_id: AtomicU64,
}

impl RouterRegistry {
    pub fn new(transport: Arc<dyn RpcTransport>, address: impl Into<String>) -> Self {
        Self {
            transport,
            address: address.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn eth_call(
        &self,
        family: &str,
        signature: &str,
        args: Vec<DynSolValue>,
        outputs: Vec<DynSolType>,
    ) -> Result<Vec<DynSolValue>, IngestError> {
        let data = encode_call(signature, args);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let result = self
            .transport
            .request(JsonRpcRequest::eth_call(id, &self.address, &data))
            .await
            .map_err(from_transport)?;
        let hex = result.as_str().ok_or_else(|| IngestError::Discovery {
            family: family.to_string(),
            reason: format!("{signature} returned non-string result: {result}"),
        })?;
        decode_output(outputs, hex).map_err(|e| IngestError::Discovery {
            family: family.to_string(),
            reason: format!("{signature}: {e}"),
        })
    }
}

#[async_trait]
impl ContractRegistry for RouterRegistry {
    async fn target_count(&self, family: &str) -> Result<u64, IngestError> {
        let out = self
            .eth_call(
                family,
                GET_TARGET_COUNT,
                vec![DynSolValue::String(family.to_string())],
                vec![DynSolType::Uint(256)],
            )
            .await?;
        match out.first() {
            Some(DynSolValue::Uint(n, _)) => u64::try_from(*n).map_err(|_| IngestError::Discovery {
                family: family.to_string(),
                reason: format!("target count {n} out of range"),
            }),
            other => Err(IngestError::Discovery {
                family: family.to_string(),
                reason: format!("unexpected getTargetCount output: {other:?}"),
            }),
        }
    }

    async fn target_at(&self, family: &str, index: u64) -> Result<TargetRecord, IngestError> {
        let out = self
            .eth_call(
                family,
                GET_IDX,
                vec![
                    DynSolValue::String(family.to_string()),
                    DynSolValue::Uint(U256::from(index), 256),
                ],
                vec![DynSolType::Address, DynSolType::String],
            )
            .await?;
        match out.as_slice() {
            [DynSolValue::Address(addr), DynSolValue::String(hash)] => Ok(TargetRecord {
                family: family.to_string(),
                address: format!("{addr:#x}"),
                descriptor_hash: hash.clone(),
            }),
            other => Err(IngestError::Discovery {
                family: family.to_string(),
                reason: format!("unexpected getIdx output: {other:?}"),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("router {} via {}", self.address, self.transport.url())
    }
}
