//! Instance-caching group decorator.

use std::sync::Arc;

use async_trait::async_trait;

use super::NodeGroup;
use crate::Result;
use crate::cache::InstanceCache;
use crate::config::CacheConfig;
use crate::types::InstanceRecord;

/// Wraps a [`NodeGroup`] so that its member listing is served from an
/// [`InstanceCache`].
///
/// Scaling operations are delegated and then invalidate the cache, whether
/// or not they succeeded, since a failed operation may still have changed
/// the group.
///
/// ```rust,ignore
/// let group: Arc<dyn NodeGroup> = Arc::new(InstanceCachingGroup::from_config(inner, &config));
/// cache.register(group);
/// ```
pub struct InstanceCachingGroup {
    inner: Arc<dyn NodeGroup>,
    cache: InstanceCache,
}

impl InstanceCachingGroup {
    pub fn new(inner: Arc<dyn NodeGroup>, cache: InstanceCache) -> Self {
        Self { inner, cache }
    }

    /// Wrap `inner` with an instance cache built from `config`.
    pub fn from_config(inner: Arc<dyn NodeGroup>, config: &CacheConfig) -> Self {
        Self::new(inner, InstanceCache::from_config(config))
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    pub fn inner(&self) -> &Arc<dyn NodeGroup> {
        &self.inner
    }
}

#[async_trait]
impl NodeGroup for InstanceCachingGroup {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn min_size(&self) -> usize {
        self.inner.min_size()
    }

    fn max_size(&self) -> usize {
        self.inner.max_size()
    }

    async fn nodes(&self) -> Result<Vec<InstanceRecord>> {
        let instances = self.cache.get_or_refresh(|| self.inner.nodes()).await?;
        Ok(instances.as_ref().clone())
    }

    async fn create(&self) -> Result<()> {
        self.inner.create().await
    }

    async fn delete(&self) -> Result<()> {
        let result = self.inner.delete().await;
        self.cache.invalidate();
        result
    }

    async fn resize(&self, target: usize) -> Result<()> {
        let result = self.inner.resize(target).await;
        self.cache.invalidate();
        result
    }
}
