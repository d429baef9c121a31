//! Builder selecting the cache engine

use std::sync::Arc;

use tracing::info;

use crate::cache::{CachedResourceCache, DirectResourceCache};
use crate::config::CacheConfig;
use crate::remote::FleetClient;
use crate::traits::ResourceCache;
use crate::{FleetCacheError, Result};

/// Main entry point for creating resource caches.
pub struct FleetCache;

impl FleetCache {
    /// Create a new builder for configuring the cache.
    pub fn builder() -> FleetCacheBuilder {
        FleetCacheBuilder::new()
    }
}

/// Builder for configuring resource caches.
///
/// The engine is chosen once, in [`build`](Self::build), from
/// [`CacheConfig::disable_caching`] after environment overrides are
/// applied.
pub struct FleetCacheBuilder {
    client: Option<Arc<dyn FleetClient>>,
    config: CacheConfig,
    env_overrides: bool,
}

impl FleetCacheBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            config: CacheConfig::default(),
            env_overrides: true,
        }
    }

    /// Remote API client the cache reads through. Required.
    pub fn client(mut self, client: Arc<dyn FleetClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Select the direct engine.
    pub fn disable_caching(mut self, disabled: bool) -> Self {
        self.config.disable_caching = disabled;
        self
    }

    /// Ignore `FLEETCACHE_DISABLE_CACHING`.
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Build the cache.
    ///
    /// A cached engine is filled once before it is returned; if that first
    /// refresh fails, so does the build.
    pub async fn build(self) -> Result<Arc<dyn ResourceCache>> {
        let client = self.client.ok_or_else(|| {
            FleetCacheError::Configuration("no fleet client configured".to_string())
        })?;

        let config = if self.env_overrides {
            self.config.with_env_overrides()?
        } else {
            self.config
        };
        config.validate()?;

        if config.disable_caching {
            info!("caching disabled, reads go to the remote API");
            return Ok(Arc::new(DirectResourceCache::new(client, config)));
        }

        let cache = CachedResourceCache::new(client, config);
        cache.regenerate().await?;
        info!(
            refresh_interval_secs = cache.config().refresh_interval_secs,
            "fleet cache ready"
        );
        Ok(Arc::new(cache))
    }
}

impl Default for FleetCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
