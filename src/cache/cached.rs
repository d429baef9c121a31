//! TTL snapshot engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{try_join_all, try_join3};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::lookup::{scan_groups, shortcut};
use super::sku::{SharedSkuTables, require_location};
use super::snapshot::{Snapshot, SnapshotStore};
use crate::config::CacheConfig;
use crate::group::{GroupRegistry, NodeGroup};
use crate::remote::FleetClient;
use crate::remote::fetch::{RemoteFetcher, with_deadline};
use crate::telemetry;
use crate::traits::{CacheMode, ResourceCache};
use crate::types::{
    AgentPoolMap, ResourceReference, ScaleSetMap, SkuRecord, VirtualMachineMap, VmKind,
    instance_key,
};
use crate::{FleetCacheError, Result};

/// Resource cache backed by a periodically refreshed [`Snapshot`].
///
/// Reads are served from the current snapshot and never touch the remote
/// API. [`regenerate`](ResourceCache::regenerate) refreshes the snapshot
/// once it is older than the configured refresh interval; concurrent calls
/// share one refresh. A failed refresh publishes nothing.
///
/// Ownership lookups that miss every registered group are remembered until
/// the next successful refresh, so repeated lookups of a foreign instance
/// cost one map probe.
pub struct CachedResourceCache {
    fetcher: RemoteFetcher,
    registry: GroupRegistry,
    store: SnapshotStore,
    skus: SharedSkuTables,
    refresh_lock: Mutex<()>,
}

impl CachedResourceCache {
    /// An empty cache. Nothing is fetched until the first
    /// [`regenerate`](ResourceCache::regenerate).
    pub fn new(client: Arc<dyn FleetClient>, config: CacheConfig) -> Self {
        Self {
            fetcher: RemoteFetcher::new(client, config),
            registry: GroupRegistry::new(),
            store: SnapshotStore::new(),
            skus: SharedSkuTables::new(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        self.fetcher.config()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// When the current snapshot was fetched; `None` before the first
    /// refresh and after an invalidation.
    pub fn last_refresh(&self) -> Option<Instant> {
        self.store.last_refresh()
    }

    /// Number of ids currently remembered as owned by no group.
    pub fn unowned_count(&self) -> usize {
        self.store.unowned_len()
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let (scale_sets, virtual_machines, vms_pools) = try_join3(
            self.fetcher.scale_sets(),
            self.fetcher.virtual_machines(),
            self.fetcher.vms_pools(),
        )
        .await?;
        let index = self.build_index().await?;
        Ok(Snapshot::new(scale_sets, virtual_machines, vms_pools, index))
    }

    /// Map every member of every registered group to its group. Any group
    /// failing to list fails the whole rebuild.
    async fn build_index(&self) -> Result<HashMap<String, Arc<dyn NodeGroup>>> {
        let deadline = self.fetcher.config().timeouts.default_call();
        let listings = try_join_all(self.registry.list().into_iter().map(|group| async move {
            match with_deadline("list_group_instances", deadline, group.nodes()).await {
                Ok(nodes) => Ok((group, nodes)),
                Err(e) => Err(FleetCacheError::GroupListing {
                    group: group.id().to_string(),
                    message: e.to_string(),
                }),
            }
        }))
        .await?;

        let mut index = HashMap::new();
        for (group, nodes) in listings {
            for node in nodes {
                index.insert(instance_key(&node.id), group.clone());
            }
        }
        Ok(index)
    }

    async fn refresh(&self) -> Result<()> {
        let ttl = self.fetcher.config().snapshot_ttl();
        if self.store.is_fresh(Instant::now(), ttl) {
            trace!("snapshot still fresh, skipping refresh");
            return Ok(());
        }

        let _flight = self.refresh_lock.lock().await;
        if self.store.is_fresh(Instant::now(), ttl) {
            return Ok(());
        }

        let epoch = self.store.epoch();
        let started = Instant::now();
        let result = self.fetch_snapshot().await;
        metrics::histogram!(telemetry::SNAPSHOT_REFRESH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(candidate) => {
                let scale_sets = candidate.scale_sets().len();
                let pools = candidate.vms_pools().len();
                let instances = candidate.indexed_instances();
                let generation = self.store.publish(candidate, Instant::now(), epoch);
                metrics::counter!(telemetry::SNAPSHOT_REFRESHES_TOTAL, "status" => "ok")
                    .increment(1);
                info!(generation, scale_sets, pools, instances, "published fleet snapshot");
                Ok(())
            }
            Err(e) => {
                metrics::counter!(telemetry::SNAPSHOT_REFRESHES_TOTAL, "status" => "error")
                    .increment(1);
                warn!(error = %e, "fleet snapshot refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    fn registrations_changed(&self) {
        self.store.invalidate();
        self.store.clear_unowned();
    }
}

#[async_trait]
impl ResourceCache for CachedResourceCache {
    fn mode(&self) -> CacheMode {
        CacheMode::Cached
    }

    fn register(&self, group: Arc<dyn NodeGroup>) -> bool {
        let changed = self.registry.register(group);
        if changed {
            self.registrations_changed();
        }
        changed
    }

    fn unregister(&self, group: &dyn NodeGroup) -> bool {
        let changed = self.registry.unregister(group.id());
        if changed {
            self.registrations_changed();
        }
        changed
    }

    fn registered_node_groups(&self) -> Vec<Arc<dyn NodeGroup>> {
        self.registry.list()
    }

    async fn find_for_instance(
        &self,
        instance: &ResourceReference,
        vm_kind: VmKind,
    ) -> Result<Option<Arc<dyn NodeGroup>>> {
        let (snapshot, epoch) = self.store.view();
        let resource_id = instance.normalized_id()?;
        let key = instance_key(&resource_id);

        if self.store.is_unowned(&key) {
            metrics::counter!(telemetry::UNOWNED_HITS_TOTAL).increment(1);
            trace!(instance = %resource_id, "known unowned instance");
            return Ok(None);
        }

        let has_pools = !snapshot.vms_pools().is_empty();
        if let Some(reason) = shortcut(&resource_id, vm_kind, has_pools, snapshot.scale_sets()) {
            debug!(instance = %resource_id, ?reason, "instance is not managed by any node group");
            self.store.mark_unowned(key, epoch);
            return Ok(None);
        }

        // The index may predate an unregistration.
        if let Some(group) = snapshot.group_for(&key)
            && self.registry.contains(group.id())
        {
            return Ok(Some(group));
        }

        let groups = self.registry.list();
        let deadline = self.fetcher.config().timeouts.default_call();
        if let Some(group) = scan_groups(&groups, &resource_id, deadline).await {
            return Ok(Some(group));
        }

        debug!(instance = %resource_id, "no node group owns instance");
        self.store.mark_unowned(key, epoch);
        Ok(None)
    }

    async fn has_instance(&self, provider_id: &str) -> Result<bool> {
        let resource_id = ResourceReference::from_provider_id(provider_id).normalized_id()?;
        let owner = self.store.current().group_for(&instance_key(&resource_id));
        Ok(owner.is_some_and(|group| self.registry.contains(group.id())))
    }

    async fn scale_sets(&self) -> Arc<ScaleSetMap> {
        self.store.current().scale_sets().clone()
    }

    async fn virtual_machines(&self) -> Arc<VirtualMachineMap> {
        self.store.current().virtual_machines().clone()
    }

    async fn vms_pool_map(&self) -> Arc<AgentPoolMap> {
        self.store.current().vms_pools().clone()
    }

    async fn autoscaling_options(&self, reference: &ResourceReference) -> HashMap<String, String> {
        self.store
            .current()
            .scale_sets()
            .get(reference.name())
            .map(|set| set.autoscaling_options())
            .unwrap_or_default()
    }

    fn has_vm_skus(&self) -> bool {
        self.skus.has_tables()
    }

    async fn sku(&self, sku_name: &str, location: &str) -> Result<SkuRecord> {
        require_location(location)?;
        let table = self.skus.get_or_load(&self.fetcher, location).await?;
        table.virtual_machine(sku_name, location)
    }

    async fn regenerate(&self) -> Result<()> {
        self.refresh().await
    }

    fn invalidate_cache(&self) {
        debug!("fleet snapshot invalidated");
        self.store.invalidate();
    }

    fn cleanup(&self) {
        self.store.reset();
        self.skus.clear();
        info!("fleet cache cleaned up");
    }
}
