//! Remote fleet-management API boundary.
//!
//! [`FleetClient`] is the capability set the caches consume from the remote
//! API. Building a real client (credentials, endpoints, retries) is the
//! owner's concern; the caches only ever see this trait.
//!
//! Every call the caches make goes through [`fetch::RemoteFetcher`], which
//! applies the configured deadline for that kind of call and records the
//! outcome. A call that misses its deadline fails with
//! [`FleetCacheError::Timeout`](crate::FleetCacheError::Timeout); dropping
//! the caller's future cancels the in-flight call.

pub(crate) mod fetch;

use async_trait::async_trait;

use crate::Result;
use crate::types::{AgentPoolPage, ScaleSetRecord, SkuRecord, VirtualMachineRecord};

/// Remote fleet-management API as seen by the caches.
#[async_trait]
pub trait FleetClient: Send + Sync {
    /// List all scale sets in `resource_group`.
    async fn list_scale_sets(&self, resource_group: &str) -> Result<Vec<ScaleSetRecord>>;

    /// List all standalone virtual machines in `resource_group`, with tags.
    async fn list_virtual_machines(
        &self,
        resource_group: &str,
    ) -> Result<Vec<VirtualMachineRecord>>;

    /// Fetch one page of the agent pools of a managed cluster.
    ///
    /// `page` is the continuation token of the previous page, `None` for
    /// the first.
    async fn list_agent_pools(
        &self,
        resource_group: &str,
        cluster_name: &str,
        page: Option<&str>,
    ) -> Result<AgentPoolPage>;

    /// List the compute SKUs offered in `location`.
    async fn list_skus(&self, location: &str) -> Result<Vec<SkuRecord>>;

    /// Whether this client can reach the agent-pool API at all.
    fn supports_agent_pools(&self) -> bool {
        true
    }
}
