//! Consumer orchestration and its builder.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainfeed_core::{ConsumerConfig, MemoryQueue};
//! use chainfeed_evm::ConsumerBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), chainfeed_core::IngestError> {
//! let queue = Arc::new(MemoryQueue::new());
//! let consumer = ConsumerBuilder::new(ConsumerConfig::default())
//!     .registry_address("0x00000000000000000000000000000000000000aa")
//!     .poll_interval_ms(2_000)
//!     .queue(queue.clone())
//!     .build()?;
//! consumer.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chainfeed_abi::DecodeTable;
use chainfeed_core::{
    BlockNumber, ConsumerConfig, ContractInstance, CursorStore, FileCursorStore, IngestError,
    MemoryCursorStore, WorkQueue,
};
use chainfeed_rpc::{HttpClientConfig, HttpRpcClient, RetryConfig, RpcTransport};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::blob::{BlobStore, IpfsBlobStore};
use crate::directory::ContractDirectory;
use crate::dispatcher::Dispatcher;
use crate::error::from_transport;
use crate::fetcher::LogFetcher;
use crate::poller::Poller;
use crate::registry::{ContractRegistry, RouterRegistry};
use crate::resolver::InterfaceResolver;

/// Fluent builder for [`Consumer`].
///
/// Every collaborator defaults to the one described by the config; tests and
/// embedders swap them out.
pub struct ConsumerBuilder {
    config: ConsumerConfig,
    transport: Option<Arc<dyn RpcTransport>>,
    registry: Option<Arc<dyn ContractRegistry>>,
    blobs: Option<Arc<dyn BlobStore>>,
    queue: Option<Arc<dyn WorkQueue>>,
    cursors: Option<Arc<dyn CursorStore>>,
    table: Option<DecodeTable>,
}

impl ConsumerBuilder {
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            transport: None,
            registry: None,
            blobs: None,
            queue: None,
            cursors: None,
            table: None,
        }
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    pub fn registry_address(mut self, address: impl Into<String>) -> Self {
        self.config.registry_address = Some(address.into());
        self
    }

    pub fn families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn denylist<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.denylist = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn origin_block(mut self, block: BlockNumber) -> Self {
        self.config.origin_block = block;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn descriptor_timeout_ms(mut self, ms: u64) -> Self {
        self.config.descriptor_timeout_ms = ms;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn ContractRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn cursor_store(mut self, cursors: Arc<dyn CursorStore>) -> Self {
        self.cursors = Some(cursors);
        self
    }

    pub fn decode_table(mut self, table: DecodeTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn build(self) -> Result<Consumer, IngestError> {
        let config = self.config;
        config.validate()?;

        let queue = self
            .queue
            .ok_or_else(|| IngestError::Config("a work queue is required".into()))?;

        let transport: Arc<dyn RpcTransport> = match self.transport {
            Some(t) => t,
            None => {
                let retry = RetryConfig::from_millis(
                    config.retry.max_retries,
                    config.retry.initial_backoff_ms,
                    config.retry.max_backoff_ms,
                );
                let http_config = HttpClientConfig { retry, ..Default::default() };
                Arc::new(HttpRpcClient::new(config.rpc_url.clone(), http_config).map_err(from_transport)?)
            }
        };

        let registry: Arc<dyn ContractRegistry> = match (self.registry, &config.registry_address) {
            (Some(r), _) => r,
            (None, Some(address)) => Arc::new(RouterRegistry::new(Arc::clone(&transport), address.clone())),
            (None, None) => {
                return Err(IngestError::Config(
                    "registry_address is required to discover contracts".into(),
                ))
            }
        };

        let blobs: Arc<dyn BlobStore> = match self.blobs {
            Some(b) => b,
            None => Arc::new(IpfsBlobStore::new(config.ipfs_url.clone())?),
        };

        let cursors: Arc<dyn CursorStore> = match (self.cursors, &config.cursor_file) {
            (Some(c), _) => c,
            (None, Some(path)) => Arc::new(FileCursorStore::new(path.clone())),
            (None, None) => Arc::new(MemoryCursorStore::new()),
        };

        let table = self.table.unwrap_or_default();
        let directory = ContractDirectory::new(registry, config.denylist.clone());
        let resolver = InterfaceResolver::new(
            blobs,
            table.clone(),
            Duration::from_millis(config.descriptor_timeout_ms),
        );

        Ok(Consumer {
            directory,
            resolver,
            fetcher: Arc::new(LogFetcher::new(transport)),
            dispatcher: Arc::new(Dispatcher::new(table, queue)),
            cursors,
            config,
        })
    }
}

/// Discovers contracts, loads their interfaces and polls each one.
pub struct Consumer {
    config: ConsumerConfig,
    directory: ContractDirectory,
    resolver: InterfaceResolver,
    fetcher: Arc<LogFetcher>,
    dispatcher: Arc<Dispatcher>,
    cursors: Arc<dyn CursorStore>,
}

impl Consumer {
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn decode_table(&self) -> &DecodeTable {
        self.resolver.table()
    }

    /// Discover every tracked instance and register its interface.
    ///
    /// Must complete before polling starts: pollers only read the table.
    pub async fn discover(&self) -> Vec<ContractInstance> {
        let targets = self.directory.discover(&self.config.families).await;
        let instances = self.resolver.resolve_all(&targets).await;
        tracing::info!(
            discovered = targets.len(),
            tracked = instances.len(),
            events = self.decode_table().len(),
            "contract discovery complete"
        );
        instances
    }

    pub fn poller(&self, instance: ContractInstance) -> Poller {
        Poller::new(
            instance,
            self.config.origin_block,
            Duration::from_millis(self.config.poll_interval_ms),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.cursors),
        )
    }

    /// Discover, then poll every instance until `cancel` fires.
    ///
    /// A poller that dies on an internal error is logged; the others keep
    /// running.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IngestError> {
        let instances = self.discover().await;
        if instances.is_empty() {
            tracing::warn!("no contracts to track");
        }

        let mut tasks = JoinSet::new();
        for instance in instances {
            let poller = self.poller(instance);
            let address = poller.address().to_string();
            let cancel = cancel.child_token();
            tasks.spawn(async move { (address, poller.run(cancel).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((address, Err(e))) => {
                    tracing::error!(address = %address, error = %e, "poller exited with error")
                }
                Err(e) => tracing::error!(error = %e, "poller task panicked"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfeed_core::MemoryQueue;

    #[test]
    fn build_requires_queue_and_registry() {
        let err = ConsumerBuilder::new(ConsumerConfig::default()).build().err().unwrap();
        assert!(matches!(err, IngestError::Config(_)));

        let err = ConsumerBuilder::new(ConsumerConfig::default())
            .queue(Arc::new(MemoryQueue::new()))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("registry_address"));
    }

    #[test]
    fn build_with_router_defaults() {
        let consumer = ConsumerBuilder::new(ConsumerConfig::default())
            .registry_address("0x00000000000000000000000000000000000000aa")
            .origin_block(BlockNumber(0x41736a))
            .families(["tagger"])
            .queue(Arc::new(MemoryQueue::new()))
            .build()
            .unwrap();
        assert_eq!(consumer.config().families, vec!["tagger"]);
        assert_eq!(consumer.config().origin_block, BlockNumber(0x41736a));
        assert!(consumer.decode_table().is_empty());
    }

    #[test]
    fn build_validates_config() {
        let err = ConsumerBuilder::new(ConsumerConfig::default())
            .poll_interval_ms(0)
            .registry_address("0x00000000000000000000000000000000000000aa")
            .queue(Arc::new(MemoryQueue::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
