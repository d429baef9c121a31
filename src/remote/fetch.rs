//! Deadline-bound fetches shared by the cached and direct engines.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use super::FleetClient;
use crate::config::CacheConfig;
use crate::telemetry;
use crate::types::{
    AgentPoolMap, AgentPoolRecord, ScaleSetMap, SkuRecord, VirtualMachineMap, group_by_pool,
};
use crate::{FleetCacheError, Result};

/// Run `call` under `deadline`, recording the outcome.
pub(crate) async fn with_deadline<T, Fut>(
    operation: &'static str,
    deadline: Duration,
    call: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let result = match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(FleetCacheError::Timeout {
            operation,
            after: deadline,
        }),
    };
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(telemetry::REMOTE_CALLS_TOTAL,
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
    result
}

/// The remote calls both engines make, scoped by the cache config.
pub(crate) struct RemoteFetcher {
    client: Arc<dyn FleetClient>,
    config: CacheConfig,
}

impl RemoteFetcher {
    pub(crate) fn new(client: Arc<dyn FleetClient>, config: CacheConfig) -> Self {
        Self { client, config }
    }

    pub(crate) fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Scale sets in scope, keyed by name.
    pub(crate) async fn scale_sets(&self) -> Result<ScaleSetMap> {
        let sets = with_deadline(
            "list_scale_sets",
            self.config.timeouts.scale_sets(),
            self.client.list_scale_sets(&self.config.resource_group),
        )
        .await?;
        Ok(sets.into_iter().map(|s| (s.name.clone(), s)).collect())
    }

    /// Standalone virtual machines in scope, grouped by pool tag.
    pub(crate) async fn virtual_machines(&self) -> Result<VirtualMachineMap> {
        let machines = with_deadline(
            "list_virtual_machines",
            self.config.timeouts.default_call(),
            self.client.list_virtual_machines(&self.config.resource_group),
        )
        .await?;
        Ok(group_by_pool(machines))
    }

    /// Whether instance-backed agent pools are listed at all.
    pub(crate) fn agent_pools_enabled(&self) -> bool {
        self.config.enable_vms_agent_pool && self.client.supports_agent_pools()
    }

    /// Instance-backed agent pools, keyed by name. Empty when the feature is
    /// off. One deadline covers every page; any failed page fails the whole
    /// listing.
    pub(crate) async fn vms_pools(&self) -> Result<AgentPoolMap> {
        if !self.agent_pools_enabled() {
            return Ok(AgentPoolMap::new());
        }
        let pools = with_deadline(
            "list_agent_pools",
            self.config.timeouts.agent_pools(),
            self.all_agent_pools(),
        )
        .await?;
        Ok(pools
            .into_iter()
            .filter(|p| p.is_instance_backed())
            .inspect(|p| trace!(pool = %p.name, "found instance-backed pool"))
            .map(|p| (p.name.clone(), p))
            .collect())
    }

    async fn all_agent_pools(&self) -> Result<Vec<AgentPoolRecord>> {
        let mut pools = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_agent_pools(
                    &self.config.cluster_resource_group,
                    &self.config.cluster_name,
                    token.as_deref(),
                )
                .await?;
            pools.extend(page.pools);
            match page.next {
                Some(next) => token = Some(next),
                None => return Ok(pools),
            }
        }
    }

    /// SKUs offered in `location`.
    pub(crate) async fn skus(&self, location: &str) -> Result<Vec<SkuRecord>> {
        with_deadline(
            "list_skus",
            self.config.timeouts.default_call(),
            self.client.list_skus(location),
        )
        .await
    }
}
