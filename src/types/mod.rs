//! Public types for the fleetcache API.

mod instance;
mod reference;
mod resource;
mod sku;

pub use instance::{InstanceRecord, InstanceState, VmKind};
pub(crate) use reference::instance_key;
pub use reference::{
    PROVIDER_ID_SCHEME, ResourceReference, is_virtual_machine_id,
    normalize_resource_id,
};
pub use resource::{
    AGENT_POOL_NAME_TAG, AUTOSCALING_OPTIONS_TAG_PREFIX, AgentPoolMap, AgentPoolPage,
    AgentPoolRecord, AgentPoolType, LEGACY_AGENT_POOL_NAME_TAG, OrchestrationMode, ScaleSetMap,
    ScaleSetRecord, VirtualMachineMap, VirtualMachineRecord, extract_autoscaling_options,
    group_by_pool,
};
pub use sku::{SkuRecord, VIRTUAL_MACHINES_RESOURCE_TYPE};
