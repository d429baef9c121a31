//! Scalable groups as seen by the caches.
//!
//! A [`NodeGroup`] is owned by the autoscaler; the caches only hold
//! references to registered groups and call their member listing. Groups
//! are registered through a [`GroupRegistry`], shared by both cache modes so
//! that swapping modes never changes registration behaviour.
//!
//! [`InstanceCachingGroup`] decorates any group with a per-group
//! [`InstanceCache`](crate::cache::InstanceCache), the same way a
//! retrying decorator wraps a client.

mod caching;
mod registry;

pub use caching::InstanceCachingGroup;
pub use registry::GroupRegistry;

use async_trait::async_trait;

use crate::types::InstanceRecord;
use crate::{FleetCacheError, Result};

/// A scalable group of instances (a scale set or an agent pool).
///
/// Only identity, bounds and member listing are required; lifecycle
/// operations default to [`FleetCacheError::NotImplemented`].
#[async_trait]
pub trait NodeGroup: Send + Sync {
    /// Unique id. Compared case-insensitively.
    fn id(&self) -> &str;

    fn min_size(&self) -> usize;

    fn max_size(&self) -> usize;

    /// Current member instances. May call the remote API.
    async fn nodes(&self) -> Result<Vec<InstanceRecord>>;

    /// Create the group.
    async fn create(&self) -> Result<()> {
        Err(FleetCacheError::NotImplemented("create"))
    }

    /// Delete the group.
    async fn delete(&self) -> Result<()> {
        Err(FleetCacheError::NotImplemented("delete"))
    }

    /// Set the group's target size.
    async fn resize(&self, _target: usize) -> Result<()> {
        Err(FleetCacheError::NotImplemented("resize"))
    }
}
