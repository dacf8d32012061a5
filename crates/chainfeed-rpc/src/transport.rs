//! The `RpcTransport` trait: the seam every JSON-RPC provider sits behind.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Async JSON-RPC transport.
///
/// Object-safe; stored as `Arc<dyn RpcTransport>` and shared across pollers.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response envelope.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Send `req` and unwrap the `result` member, mapping an RPC error object
    /// to [`TransportError::Rpc`].
    async fn request(&self, req: JsonRpcRequest) -> Result<Value, TransportError> {
        let resp = self.send(req).await?;
        resp.into_result().map_err(TransportError::Rpc)
    }
}

/// Convenience: send `req` and deserialize the result.
pub async fn call<T: DeserializeOwned>(
    transport: &dyn RpcTransport,
    req: JsonRpcRequest,
) -> Result<T, TransportError> {
    let result = transport.request(req).await?;
    serde_json::from_value(result).map_err(TransportError::Deserialization)
}
