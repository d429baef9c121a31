//! Fleet resource records: scale sets, standalone virtual machines and
//! agent pools, as listed by the remote API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tag carrying the agent-pool name of a standalone virtual machine.
pub const AGENT_POOL_NAME_TAG: &str = "aks-managed-poolName";

/// Pre-managed-cluster spelling of [`AGENT_POOL_NAME_TAG`].
pub const LEGACY_AGENT_POOL_NAME_TAG: &str = "poolName";

/// Scale-set tag prefix under which per-group autoscaling options live.
pub const AUTOSCALING_OPTIONS_TAG_PREFIX: &str =
    "k8s.io_cluster-autoscaler_node-template_autoscaling_";

/// How a scale set orchestrates its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrchestrationMode {
    /// Identical instances addressed as scale-set members.
    #[default]
    Uniform,
    /// Instances are standalone virtual machines attached to the scale set.
    Flexible,
}

/// One scale set in the configured resource group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSetRecord {
    pub name: String,
    #[serde(default)]
    pub orchestration_mode: OrchestrationMode,
    /// SKU name of the scale set's instances, if reported.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Current instance count, if reported.
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ScaleSetRecord {
    pub fn new(name: impl Into<String>, orchestration_mode: OrchestrationMode) -> Self {
        Self {
            name: name.into(),
            orchestration_mode,
            sku: None,
            location: None,
            capacity: None,
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn is_flexible(&self) -> bool {
        self.orchestration_mode == OrchestrationMode::Flexible
    }

    /// Autoscaling options encoded in this scale set's tags.
    pub fn autoscaling_options(&self) -> HashMap<String, String> {
        extract_autoscaling_options(&self.tags)
    }
}

/// A standalone virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineRecord {
    /// Resource path of the machine.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl VirtualMachineRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The agent pool this machine belongs to, from its tags.
    pub fn pool_name(&self) -> Option<&str> {
        self.tags
            .get(AGENT_POOL_NAME_TAG)
            .or_else(|| self.tags.get(LEGACY_AGENT_POOL_NAME_TAG))
            .map(String::as_str)
    }
}

/// Agent-pool type discriminator reported by the cluster API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentPoolType {
    VirtualMachineScaleSets,
    /// Pool members are individually managed virtual machines.
    VirtualMachines,
    AvailabilitySet,
    #[serde(other)]
    Unknown,
}

/// One agent pool of the managed cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPoolRecord {
    pub name: String,
    pub pool_type: AgentPoolType,
    #[serde(default)]
    pub vm_size: Option<String>,
    #[serde(default)]
    pub count: Option<i32>,
}

impl AgentPoolRecord {
    pub fn new(name: impl Into<String>, pool_type: AgentPoolType) -> Self {
        Self {
            name: name.into(),
            pool_type,
            vm_size: None,
            count: None,
        }
    }

    /// Whether the pool is backed by standalone virtual machines.
    pub fn is_instance_backed(&self) -> bool {
        self.pool_type == AgentPoolType::VirtualMachines
    }
}

/// Scale sets keyed by name.
pub type ScaleSetMap = HashMap<String, ScaleSetRecord>;

/// Standalone virtual machines keyed by pool name.
pub type VirtualMachineMap = HashMap<String, Vec<VirtualMachineRecord>>;

/// Instance-backed agent pools keyed by name.
pub type AgentPoolMap = HashMap<String, AgentPoolRecord>;

/// One page of an agent-pool listing.
#[derive(Debug, Clone, Default)]
pub struct AgentPoolPage {
    pub pools: Vec<AgentPoolRecord>,
    /// Continuation token; `None` on the last page.
    pub next: Option<String>,
}

/// Extract autoscaling options from scale-set tags.
///
/// Every tag named `<prefix><option>` yields `option => lowercase(value)`;
/// a tag that is exactly the prefix is ignored.
pub fn extract_autoscaling_options(tags: &HashMap<String, String>) -> HashMap<String, String> {
    tags.iter()
        .filter_map(|(key, value)| {
            let option = key.strip_prefix(AUTOSCALING_OPTIONS_TAG_PREFIX)?;
            (!option.is_empty()).then(|| (option.to_string(), value.to_lowercase()))
        })
        .collect()
}

/// Group standalone virtual machines by pool name. Machines without a pool
/// tag are dropped.
pub fn group_by_pool(machines: impl IntoIterator<Item = VirtualMachineRecord>) -> VirtualMachineMap {
    let mut pools = VirtualMachineMap::new();
    for vm in machines {
        let Some(pool) = vm.pool_name().map(str::to_string) else {
            continue;
        };
        pools.entry(pool).or_default().push(vm);
    }
    pools
}
