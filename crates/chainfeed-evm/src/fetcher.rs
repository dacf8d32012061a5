//! Log fetcher: one ranged `eth_getLogs` per poll cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chainfeed_core::BlockNumber;
use chainfeed_rpc::{JsonRpcRequest, LogFilter, RpcTransport, TransportError};
use serde_json::Value;

pub struct LogFetcher {
    transport: Arc<dyn RpcTransport>,
    next_id: AtomicU64,
}

impl LogFetcher {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// All logs emitted by `address` from `from_block` up to `latest`.
    ///
    /// Returns the raw `result` member, undecoded. `None` means no new data
    /// this round: the transport failed, the endpoint answered with an
    /// error, or the result was null. Each case is logged here.
    pub async fn fetch_logs(&self, address: &str, from_block: BlockNumber) -> Option<Value> {
        let filter = LogFilter::address_from(address, from_block.to_hex());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(address, from_block = %from_block, "eth_getLogs");

        match self.transport.request(JsonRpcRequest::get_logs(id, &filter)).await {
            Ok(Value::Null) => {
                tracing::warn!(address, url = %self.transport.url(), "eth_getLogs returned a null result");
                None
            }
            Ok(result) => {
                tracing::debug!(
                    address,
                    count = result.as_array().map(Vec::len),
                    "eth_getLogs complete"
                );
                Some(result)
            }
            Err(e @ TransportError::Status { .. }) => {
                tracing::warn!(
                    address,
                    status = e.status(),
                    url = %self.transport.url(),
                    "JSON-RPC provider returned improperly"
                );
                None
            }
            Err(e) => {
                tracing::warn!(address, error = %e, url = %self.transport.url(), "eth_getLogs failed");
                None
            }
        }
    }
}
