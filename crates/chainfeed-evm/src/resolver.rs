//! Interface resolver: loads descriptors and merges them into the decode table.

use std::sync::Arc;
use std::time::Duration;

use chainfeed_abi::{DecodeTable, InterfaceDescriptor};
use chainfeed_core::{ContractInstance, IngestError, TargetRecord};

use crate::blob::BlobStore;

pub struct InterfaceResolver {
    blobs: Arc<dyn BlobStore>,
    table: DecodeTable,
    timeout: Duration,
}

impl InterfaceResolver {
    pub fn new(blobs: Arc<dyn BlobStore>, table: DecodeTable, timeout: Duration) -> Self {
        Self { blobs, table, timeout }
    }

    pub fn table(&self) -> &DecodeTable {
        &self.table
    }

    /// Fetch and register the descriptor for `target`.
    pub async fn resolve(&self, target: &TargetRecord) -> Result<ContractInstance, IngestError> {
        let bytes = self.blobs.fetch_blob(&target.descriptor_hash, self.timeout).await?;
        let descriptor = InterfaceDescriptor::parse(&bytes)?;
        let added = self.table.register(&descriptor)?;
        tracing::debug!(
            family = %target.family,
            address = %target.address,
            events = added,
            "interface descriptor registered"
        );
        Ok(ContractInstance {
            family: target.family.clone(),
            address: target.address.clone(),
            descriptor: bytes,
        })
    }

    /// Resolve every target, dropping the ones whose descriptor cannot be
    /// loaded.
    pub async fn resolve_all(&self, targets: &[TargetRecord]) -> Vec<ContractInstance> {
        let mut instances = Vec::with_capacity(targets.len());
        for target in targets {
            match self.resolve(target).await {
                Ok(instance) => instances.push(instance),
                Err(e) => tracing::error!(
                    hash = %target.descriptor_hash,
                    family = %target.family,
                    address = %target.address,
                    error = %e,
                    "unable to load interface descriptor, contract not tracked"
                ),
            }
        }
        instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const ABI: &str = r#"[{"type":"event","name":"Tagged","anonymous":false,"inputs":[
        {"name":"tagger","type":"address","indexed":true},
        {"name":"tag","type":"string","indexed":false},
        {"name":"target","type":"uint256","indexed":false}]}]"#;

    struct Blobs;

    #[async_trait]
    impl BlobStore for Blobs {
        async fn fetch_blob(&self, hash: &str, timeout: Duration) -> Result<Vec<u8>, IngestError> {
            match hash {
                "QmGood" => Ok(ABI.as_bytes().to_vec()),
                "QmJunk" => Ok(b"<html>".to_vec()),
                _ => Err(IngestError::Timeout { ms: timeout.as_millis() as u64 }),
            }
        }
    }

    fn target(addr: &str, hash: &str) -> TargetRecord {
        TargetRecord {
            family: "tagger".into(),
            address: addr.into(),
            descriptor_hash: hash.into(),
        }
    }

    #[tokio::test]
    async fn failures_exclude_only_their_instance() {
        let table = DecodeTable::new();
        let resolver = InterfaceResolver::new(Arc::new(Blobs), table.clone(), Duration::from_secs(30));
        let instances = resolver
            .resolve_all(&[
                target("0x01", "QmGood"),
                target("0x02", "QmMissing"),
                target("0x03", "QmJunk"),
            ])
            .await;
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].address, "0x01");
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn timeout_surfaces_as_timeout() {
        let resolver =
            InterfaceResolver::new(Arc::new(Blobs), DecodeTable::new(), Duration::from_millis(30_000));
        let err = resolver.resolve(&target("0x02", "QmMissing")).await.unwrap_err();
        assert!(matches!(err, IngestError::Timeout { ms: 30_000 }));
    }
}
