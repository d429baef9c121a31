//! Core ResourceCache trait

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::group::NodeGroup;
use crate::types::{
    AgentPoolMap, ResourceReference, ScaleSetMap, SkuRecord, VirtualMachineMap, VmKind,
};

/// Which engine backs a [`ResourceCache`]. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// TTL snapshot with derived indexes.
    Cached,
    /// Every read goes to the remote API.
    Direct,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability contract both cache engines satisfy.
///
/// Callers hold an `Arc<dyn ResourceCache>` from
/// [`FleetCache::builder()`](crate::FleetCache::builder) and never need to
/// know which mode they got.
#[async_trait]
pub trait ResourceCache: Send + Sync {
    fn mode(&self) -> CacheMode;

    // ===== Registration =====

    /// Register `group`. Returns whether the registrations changed.
    ///
    /// A group whose id matches (case-insensitively) an existing one with
    /// the same bounds is a no-op; with different bounds it replaces the
    /// existing registration in place.
    fn register(&self, group: Arc<dyn NodeGroup>) -> bool;

    /// Remove every registration matching `group`'s id. Returns whether
    /// anything was removed.
    fn unregister(&self, group: &dyn NodeGroup) -> bool;

    /// Current registrations, in registration order.
    fn registered_node_groups(&self) -> Vec<Arc<dyn NodeGroup>>;

    // ===== Ownership =====

    /// The registered group owning `instance`, or `None` when the instance
    /// is not one of ours.
    ///
    /// Fails only when `instance` is not a resource path.
    async fn find_for_instance(
        &self,
        instance: &ResourceReference,
        vm_kind: VmKind,
    ) -> Result<Option<Arc<dyn NodeGroup>>>;

    /// Whether a registered group owns the instance with `provider_id`.
    async fn has_instance(&self, provider_id: &str) -> Result<bool>;

    // ===== Resource views =====

    /// Scale sets keyed by name.
    async fn scale_sets(&self) -> Arc<ScaleSetMap>;

    /// Standalone virtual machines keyed by pool name.
    async fn virtual_machines(&self) -> Arc<VirtualMachineMap>;

    /// Instance-backed agent pools keyed by name.
    async fn vms_pool_map(&self) -> Arc<AgentPoolMap>;

    /// Autoscaling options tagged on the scale set named by
    /// `reference`. Empty when the set is unknown.
    async fn autoscaling_options(&self, reference: &ResourceReference) -> HashMap<String, String>;

    // ===== SKUs =====

    /// Whether a persistent SKU table exists. Callers may fall back to
    /// static SKU data when this is false.
    fn has_vm_skus(&self) -> bool;

    /// The virtual-machine SKU `sku_name` in `location`.
    async fn sku(&self, sku_name: &str, location: &str) -> Result<SkuRecord>;

    // ===== Lifecycle =====

    /// Bring the cached view up to date if it is due.
    async fn regenerate(&self) -> Result<()>;

    /// Make the next [`regenerate`](Self::regenerate) fetch regardless of
    /// age.
    fn invalidate_cache(&self) {}

    /// Release held state at shutdown.
    fn cleanup(&self);
}
