//! chainfeed-rpc: JSON-RPC 2.0 types and an HTTP transport with retry.
//!
//! ```rust,no_run
//! use chainfeed_rpc::{HttpRpcClient, JsonRpcRequest, LogFilter, RpcTransport};
//!
//! # async fn demo() -> Result<(), chainfeed_rpc::TransportError> {
//! let client = HttpRpcClient::default_for("http://127.0.0.1:8545")?;
//! let filter = LogFilter::address_from("0x00000000000000000000000000000000000000aa", "0x0");
//! let logs = client.request(JsonRpcRequest::get_logs(1, &filter)).await?;
//! # let _ = logs;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, LogFilter, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::{call, RpcTransport};
