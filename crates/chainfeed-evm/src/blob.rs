//! Content-addressed blob storage for interface descriptors.

use std::time::Duration;

use async_trait::async_trait;
use chainfeed_core::IngestError;

/// Fetches blobs by content hash.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob for `hash`, failing with [`IngestError::Timeout`] once
    /// `timeout` elapses.
    async fn fetch_blob(&self, hash: &str, timeout: Duration) -> Result<Vec<u8>, IngestError>;
}

/// IPFS node reached through its HTTP API (`/api/v0/cat`).
pub struct IpfsBlobStore {
    base_url: String,
    http: reqwest::Client,
}

impl IpfsBlobStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| IngestError::Config(format!("building IPFS client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn cat_url(&self) -> String {
        format!("{}/api/v0/cat", self.base_url)
    }

    async fn cat(&self, hash: &str) -> Result<Vec<u8>, IngestError> {
        let resp = self
            .http
            .post(self.cat_url())
            .query(&[("arg", hash)])
            .send()
            .await
            .map_err(|e| IngestError::Transport(format!("IPFS cat {hash}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::Transport(format!(
                "IPFS cat {hash}: HTTP {}",
                status.as_u16()
            )));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| IngestError::Transport(format!("IPFS cat {hash}: {e}")))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl BlobStore for IpfsBlobStore {
    async fn fetch_blob(&self, hash: &str, timeout: Duration) -> Result<Vec<u8>, IngestError> {
        tracing::debug!(hash, url = %self.cat_url(), "fetching blob");
        tokio::time::timeout(timeout, self.cat(hash))
            .await
            .map_err(|_| IngestError::Timeout { ms: timeout.as_millis() as u64 })?
    }
}
