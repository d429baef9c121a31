//! Shared mocks for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetcache::{
    AgentPoolPage, AgentPoolRecord, CacheConfig, FleetCacheError, FleetClient, InstanceRecord,
    NodeGroup, OrchestrationMode, Result, ScaleSetRecord, SkuRecord, VirtualMachineRecord,
};

pub const SUBSCRIPTION: &str = "/subscriptions/sub-1/resourceGroups/RG-Nodes/providers";

/// Resource path of a standalone virtual machine.
pub fn vm_id(name: &str) -> String {
    format!("{SUBSCRIPTION}/Microsoft.Compute/virtualMachines/{name}")
}

/// Resource path of a scale-set member.
pub fn member_id(scale_set: &str, index: u32) -> String {
    format!("{SUBSCRIPTION}/Microsoft.Compute/virtualMachineScaleSets/{scale_set}/virtualMachines/{index}")
}

pub fn uniform(name: &str) -> ScaleSetRecord {
    ScaleSetRecord::new(name, OrchestrationMode::Uniform)
}

pub fn flexible(name: &str) -> ScaleSetRecord {
    ScaleSetRecord::new(name, OrchestrationMode::Flexible)
}

pub fn test_config() -> CacheConfig {
    CacheConfig::new().resource_group("rg-nodes")
}

// ============================================================================
// Remote API mock
// ============================================================================

/// Fleet API with mutable canned data and per-call counters.
#[derive(Default)]
pub struct MockFleetClient {
    scale_sets: Mutex<Vec<ScaleSetRecord>>,
    virtual_machines: Mutex<Vec<VirtualMachineRecord>>,
    agent_pool_pages: Mutex<Vec<Vec<AgentPoolRecord>>>,
    skus: Mutex<Vec<SkuRecord>>,
    failing: AtomicBool,
    failing_pool_page: Mutex<Option<usize>>,
    no_agent_pools: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub scale_set_calls: AtomicU32,
    pub virtual_machine_calls: AtomicU32,
    pub agent_pool_calls: AtomicU32,
    pub sku_calls: AtomicU32,
}

impl MockFleetClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_scale_sets(sets: Vec<ScaleSetRecord>) -> Arc<Self> {
        let client = Self::new();
        client.set_scale_sets(sets);
        client
    }

    pub fn set_scale_sets(&self, sets: Vec<ScaleSetRecord>) {
        *self.scale_sets.lock().unwrap() = sets;
    }

    pub fn set_virtual_machines(&self, machines: Vec<VirtualMachineRecord>) {
        *self.virtual_machines.lock().unwrap() = machines;
    }

    /// One inner vec per page.
    pub fn set_agent_pool_pages(&self, pages: Vec<Vec<AgentPoolRecord>>) {
        *self.agent_pool_pages.lock().unwrap() = pages;
    }

    pub fn set_skus(&self, skus: Vec<SkuRecord>) {
        *self.skus.lock().unwrap() = skus;
    }

    /// Make every listing call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_pool_page(&self, page: usize) {
        *self.failing_pool_page.lock().unwrap() = Some(page);
    }

    pub fn disable_agent_pools(&self) {
        self.no_agent_pools.store(true, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn call(&self, counter: &AtomicU32, operation: &'static str) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FleetCacheError::remote(operation, "service unavailable"));
        }
        Ok(())
    }

    pub fn scale_set_call_count(&self) -> u32 {
        self.scale_set_calls.load(Ordering::SeqCst)
    }

    pub fn sku_call_count(&self) -> u32 {
        self.sku_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FleetClient for MockFleetClient {
    async fn list_scale_sets(&self, _resource_group: &str) -> Result<Vec<ScaleSetRecord>> {
        self.call(&self.scale_set_calls, "list_scale_sets").await?;
        Ok(self.scale_sets.lock().unwrap().clone())
    }

    async fn list_virtual_machines(
        &self,
        _resource_group: &str,
    ) -> Result<Vec<VirtualMachineRecord>> {
        self.call(&self.virtual_machine_calls, "list_virtual_machines")
            .await?;
        Ok(self.virtual_machines.lock().unwrap().clone())
    }

    async fn list_agent_pools(
        &self,
        _resource_group: &str,
        _cluster_name: &str,
        page: Option<&str>,
    ) -> Result<AgentPoolPage> {
        self.call(&self.agent_pool_calls, "list_agent_pools").await?;
        let index: usize = page.map_or(0, |token| token.parse().unwrap());
        if *self.failing_pool_page.lock().unwrap() == Some(index) {
            return Err(FleetCacheError::remote("list_agent_pools", "page failed"));
        }
        let pages = self.agent_pool_pages.lock().unwrap();
        let pools = pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());
        Ok(AgentPoolPage { pools, next })
    }

    async fn list_skus(&self, location: &str) -> Result<Vec<SkuRecord>> {
        self.call(&self.sku_calls, "list_skus").await?;
        Ok(self
            .skus
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.locations.iter().any(|l| l.eq_ignore_ascii_case(location)))
            .cloned()
            .collect())
    }

    fn supports_agent_pools(&self) -> bool {
        !self.no_agent_pools.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Node group mock
// ============================================================================

/// Scalable group with a mutable member list and a listing counter.
pub struct MockGroup {
    id: String,
    min: usize,
    max: usize,
    members: Mutex<Vec<InstanceRecord>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub node_calls: AtomicU32,
    pub resize_calls: AtomicU32,
}

impl MockGroup {
    pub fn new(id: &str, min: usize, max: usize) -> Self {
        Self {
            id: id.to_string(),
            min,
            max,
            members: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
            node_calls: AtomicU32::new(0),
            resize_calls: AtomicU32::new(0),
        }
    }

    pub fn with_members(self, ids: &[String]) -> Self {
        self.set_members(ids);
        self
    }

    pub fn set_members(&self, ids: &[String]) {
        *self.members.lock().unwrap() = ids.iter().map(InstanceRecord::new).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn node_call_count(&self) -> u32 {
        self.node_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeGroup for MockGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn min_size(&self) -> usize {
        self.min
    }

    fn max_size(&self) -> usize {
        self.max
    }

    async fn nodes(&self) -> Result<Vec<InstanceRecord>> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FleetCacheError::remote("list_instances", "group unavailable"));
        }
        Ok(self.members.lock().unwrap().clone())
    }

    async fn resize(&self, target: usize) -> Result<()> {
        self.resize_calls.fetch_add(1, Ordering::SeqCst);
        let mut members = self.members.lock().unwrap();
        members.truncate(target);
        Ok(())
    }
}
