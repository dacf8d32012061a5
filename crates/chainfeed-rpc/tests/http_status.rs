//! HttpRpcClient against a bare local HTTP endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainfeed_rpc::{
    HttpClientConfig, HttpRpcClient, JsonRpcRequest, LogFilter, RetryConfig, RpcTransport,
    TransportError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve every connection with the given status line and body, counting hits.
async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(resp.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (format!("http://{addr}"), hits)
}

fn config(max_retries: u32) -> HttpClientConfig {
    HttpClientConfig {
        retry: RetryConfig::from_millis(max_retries, 10, 20),
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn server_error_surfaces_status_code() {
    let (url, hits) = serve("500 Internal Server Error", "oops").await;
    let client = HttpRpcClient::new(url, config(1)).unwrap();

    let filter = LogFilter::address_from("0x00000000000000000000000000000000000000aa", "0x0");
    let err = client.request(JsonRpcRequest::get_logs(1, &filter)).await.unwrap_err();

    assert!(matches!(err, TransportError::Status { code: 500 }), "got {err:?}");
    // first try plus one retry
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (url, hits) = serve("400 Bad Request", "{}").await;
    let client = HttpRpcClient::new(url, config(3)).unwrap();

    let err = client
        .request(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn success_returns_result() {
    let (url, _) = serve("200 OK", r#"{"jsonrpc":"2.0","id":1,"result":"0x41736a"}"#).await;
    let client = HttpRpcClient::new(url, config(0)).unwrap();

    let block: String = chainfeed_rpc::call(&client, JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
        .await
        .unwrap();
    assert_eq!(block, "0x41736a");
}

#[tokio::test]
async fn rpc_error_object_maps_to_rpc_variant() {
    let (url, _) = serve(
        "200 OK",
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}"#,
    )
    .await;
    let client = HttpRpcClient::new(url, config(0)).unwrap();

    let err = client
        .request(JsonRpcRequest::new(1, "eth_getLogs", vec![]))
        .await
        .unwrap_err();
    match err {
        TransportError::Rpc(e) => assert_eq!(e.code, -32000),
        other => panic!("expected Rpc error, got {other:?}"),
    }
}
