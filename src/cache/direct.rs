//! Stateless engine: every read is a fresh remote call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::lookup::{needs_scale_sets, scan_groups, shortcut};
use super::sku::{SkuTable, require_location};
use crate::config::CacheConfig;
use crate::group::{GroupRegistry, NodeGroup};
use crate::remote::FleetClient;
use crate::remote::fetch::RemoteFetcher;
use crate::traits::{CacheMode, ResourceCache};
use crate::types::{
    AgentPoolMap, ResourceReference, ScaleSetMap, SkuRecord, VirtualMachineMap, VmKind,
};
use crate::{FleetCacheError, Result};

/// Resource cache that memoizes nothing but the registered groups.
///
/// Listing accessors degrade to an empty result when the remote call fails
/// (the failure is logged). Ownership lookups scan the registered groups'
/// live listings on every call.
pub struct DirectResourceCache {
    fetcher: RemoteFetcher,
    registry: GroupRegistry,
}

impl DirectResourceCache {
    pub fn new(client: Arc<dyn FleetClient>, config: CacheConfig) -> Self {
        Self {
            fetcher: RemoteFetcher::new(client, config),
            registry: GroupRegistry::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        self.fetcher.config()
    }
}

#[async_trait]
impl ResourceCache for DirectResourceCache {
    fn mode(&self) -> CacheMode {
        CacheMode::Direct
    }

    fn register(&self, group: Arc<dyn NodeGroup>) -> bool {
        self.registry.register(group)
    }

    fn unregister(&self, group: &dyn NodeGroup) -> bool {
        self.registry.unregister(group.id())
    }

    fn registered_node_groups(&self) -> Vec<Arc<dyn NodeGroup>> {
        self.registry.list()
    }

    async fn find_for_instance(
        &self,
        instance: &ResourceReference,
        vm_kind: VmKind,
    ) -> Result<Option<Arc<dyn NodeGroup>>> {
        let has_pools = !self.vms_pool_map().await.is_empty();
        let resource_id = instance.normalized_id()?;

        let scale_sets = if needs_scale_sets(vm_kind, has_pools) {
            self.scale_sets().await
        } else {
            Arc::default()
        };
        if let Some(reason) = shortcut(&resource_id, vm_kind, has_pools, &scale_sets) {
            debug!(instance = %resource_id, ?reason, "instance is not managed by any node group");
            return Ok(None);
        }

        let groups = self.registry.list();
        let deadline = self.fetcher.config().timeouts.default_call();
        Ok(scan_groups(&groups, &resource_id, deadline).await)
    }

    /// Scans live listings. When no group claims the id this returns
    /// [`FleetCacheError::NotImplemented`] rather than `Ok(false)`.
    async fn has_instance(&self, provider_id: &str) -> Result<bool> {
        let resource_id = ResourceReference::from_provider_id(provider_id).normalized_id()?;
        let groups = self.registry.list();
        let deadline = self.fetcher.config().timeouts.default_call();
        match scan_groups(&groups, &resource_id, deadline).await {
            Some(_) => Ok(true),
            None => Err(FleetCacheError::NotImplemented("has_instance")),
        }
    }

    async fn scale_sets(&self) -> Arc<ScaleSetMap> {
        match self.fetcher.scale_sets().await {
            Ok(sets) => Arc::new(sets),
            Err(e) => {
                error!(error = %e, "listing scale sets failed");
                Arc::default()
            }
        }
    }

    async fn virtual_machines(&self) -> Arc<VirtualMachineMap> {
        match self.fetcher.virtual_machines().await {
            Ok(machines) => Arc::new(machines),
            Err(e) => {
                error!(error = %e, "listing virtual machines failed");
                Arc::default()
            }
        }
    }

    async fn vms_pool_map(&self) -> Arc<AgentPoolMap> {
        match self.fetcher.vms_pools().await {
            Ok(pools) => Arc::new(pools),
            Err(e) => {
                error!(error = %e, "listing agent pools failed");
                Arc::default()
            }
        }
    }

    async fn autoscaling_options(&self, reference: &ResourceReference) -> HashMap<String, String> {
        self.scale_sets()
            .await
            .get(reference.name())
            .map(|set| set.autoscaling_options())
            .unwrap_or_default()
    }

    fn has_vm_skus(&self) -> bool {
        false
    }

    async fn sku(&self, sku_name: &str, location: &str) -> Result<SkuRecord> {
        require_location(location)?;
        let table = SkuTable::load(&self.fetcher, location, CacheMode::Direct.as_str()).await?;
        table.virtual_machine(sku_name, location)
    }

    async fn regenerate(&self) -> Result<()> {
        debug!("direct resource cache has nothing to regenerate");
        Ok(())
    }

    fn cleanup(&self) {
        debug!("direct resource cache has nothing to clean up");
    }
}
