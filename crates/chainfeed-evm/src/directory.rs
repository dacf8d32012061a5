//! Contract directory: which contract instances exist, per family.

use std::sync::Arc;

use chainfeed_core::{IngestError, TargetRecord};
use futures::future::join_all;

use crate::registry::ContractRegistry;

/// Resolves tracked families to deployed instances through the registry.
pub struct ContractDirectory {
    registry: Arc<dyn ContractRegistry>,
    denylist: Vec<String>,
}

impl ContractDirectory {
    pub fn new(registry: Arc<dyn ContractRegistry>, denylist: Vec<String>) -> Self {
        Self { registry, denylist }
    }

    pub fn is_denied(&self, address: &str) -> bool {
        self.denylist.iter().any(|a| a.eq_ignore_ascii_case(address))
    }

    /// All non-denylisted instances of every family, in registry order.
    ///
    /// Families are queried concurrently. A registry failure drops that family
    /// only.
    pub async fn discover(&self, families: &[String]) -> Vec<TargetRecord> {
        let results = join_all(families.iter().map(|f| self.discover_family(f))).await;

        let mut targets = Vec::new();
        for (family, result) in families.iter().zip(results) {
            match result {
                Ok(found) => targets.extend(found),
                Err(e) => tracing::error!(family = %family, error = %e, "registry discovery failed"),
            }
        }
        targets
    }

    /// Instances of a single family.
    pub async fn discover_family(&self, family: &str) -> Result<Vec<TargetRecord>, IngestError> {
        let family = family.to_lowercase();
        let count = self.registry.target_count(&family).await?;

        if count == 0 {
            tracing::warn!(
                family = %family,
                registry = %self.registry.describe(),
                "no contracts found in registry, family is not tracked"
            );
            return Ok(Vec::new());
        }
        tracing::debug!(family = %family, count, "registry lists contracts");

        let mut targets = Vec::new();
        for i in 0..count {
            let target = self.registry.target_at(&family, i).await?;
            if self.is_denied(&target.address) {
                tracing::debug!(family = %family, address = %target.address, "skipping denylisted contract");
                continue;
            }
            targets.push(target);
        }
        Ok(targets)
    }
}
