//! fleetcache - Resource-state cache for fleet autoscaling
//!
//! This crate sits between a cluster-scaling control loop and a remote
//! fleet-management API (scale sets, standalone virtual machines and agent
//! pools). It answers "what instances exist, which group owns this
//! instance, and what SKU is this instance type" while bounding the rate of
//! remote calls.
//!
//! Two engines implement the [`ResourceCache`] contract:
//!
//! - a cached engine serving reads from a TTL snapshot with derived indexes,
//! - a direct engine calling the remote API on every read.
//!
//! [`FleetCache::builder()`] picks one at construction.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetcache::{CacheConfig, FleetCache, ResourceReference, VmKind};
//!
//! let cache = FleetCache::builder()
//!     .client(client)
//!     .config(CacheConfig::new().resource_group("rg-nodes"))
//!     .build()
//!     .await?;
//!
//! cache.register(group);
//! let owner = cache
//!     .find_for_instance(&ResourceReference::from_provider_id(&provider_id), VmKind::ScaleSetBacked)
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod group;
pub mod remote;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use cache::{
    CachedResourceCache, DirectResourceCache, FixedJitter, InstanceCache, InstanceCacheState,
    JitterSource, RandomJitter, Snapshot, SkuTable,
};
pub use config::{CacheConfig, DISABLE_CACHING_ENV, TimeoutConfig};
pub use error::{FleetCacheError, Result};
pub use factory::{FleetCache, FleetCacheBuilder};
pub use group::{GroupRegistry, InstanceCachingGroup, NodeGroup};
pub use remote::FleetClient;
pub use traits::{CacheMode, ResourceCache};

// Re-export all types
pub use types::{
    AgentPoolMap, AgentPoolPage, AgentPoolRecord, AgentPoolType, InstanceRecord, InstanceState,
    OrchestrationMode, ResourceReference, ScaleSetMap, ScaleSetRecord, SkuRecord,
    VirtualMachineMap, VirtualMachineRecord, VmKind,
};
