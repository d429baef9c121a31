//! Cache configuration.
//!
//! [`CacheConfig`] is fixed for the lifetime of a cache instance. It can be
//! built in code with the chainable setters, or parsed from TOML:
//!
//! ```toml
//! disable_caching = false
//! refresh_interval_secs = 60
//! instance_cache_ttl_secs = 300
//! instance_cache_jitter_secs = 30
//! enable_vms_agent_pool = true
//! resource_group = "rg-nodes"
//! cluster_resource_group = "rg-cluster"
//! cluster_name = "prod"
//!
//! [timeouts]
//! scale_sets_secs = 60
//! agent_pools_secs = 300
//! default_secs = 120
//! ```
//!
//! The caching mode can be forced from the environment with
//! `FLEETCACHE_DISABLE_CACHING` (see [`CacheConfig::with_env_overrides`]).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{FleetCacheError, Result};

/// Environment variable overriding [`CacheConfig::disable_caching`].
pub const DISABLE_CACHING_ENV: &str = "FLEETCACHE_DISABLE_CACHING";

/// Configuration for a resource cache.
///
/// ```rust
/// # use fleetcache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .resource_group("rg-nodes")
///     .refresh_interval(Duration::from_secs(30))
///     .instance_cache_jitter(Duration::from_secs(10));
/// assert_eq!(config.snapshot_ttl(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Select the direct (stateless) engine instead of the cached one.
    pub disable_caching: bool,
    /// Snapshot time-to-live in seconds (default: 60).
    pub refresh_interval_secs: u64,
    /// Per-group instance-cache time-to-live in seconds (default: 300).
    pub instance_cache_ttl_secs: u64,
    /// Upper bound of the random offset added to each per-group refresh,
    /// in seconds (default: 30).
    pub instance_cache_jitter_secs: u64,
    /// List instance-backed agent pools (default: false).
    pub enable_vms_agent_pool: bool,
    /// Resource group scale sets and virtual machines are listed from.
    pub resource_group: String,
    /// Resource group of the managed cluster (agent-pool listing).
    pub cluster_resource_group: String,
    /// Managed cluster name (agent-pool listing).
    pub cluster_name: String,
    /// Remote call deadlines.
    pub timeouts: TimeoutConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disable_caching: false,
            refresh_interval_secs: 60,
            instance_cache_ttl_secs: 300,
            instance_cache_jitter_secs: 30,
            enable_vms_agent_pool: false,
            resource_group: String::new(),
            cluster_resource_group: String::new(),
            cluster_name: String::new(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Deadlines applied to remote calls.
///
/// Listing agent pools pages through the cluster API and is given the
/// longest budget; scale-set listing is expected to be quick.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Scale-set listing deadline in seconds (default: 60).
    pub scale_sets_secs: u64,
    /// Agent-pool listing deadline in seconds, across all pages (default: 300).
    pub agent_pools_secs: u64,
    /// Deadline for every other remote call in seconds (default: 120).
    pub default_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            scale_sets_secs: 60,
            agent_pools_secs: 300,
            default_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn scale_sets(&self) -> Duration {
        Duration::from_secs(self.scale_sets_secs)
    }

    pub fn agent_pools(&self) -> Duration {
        Duration::from_secs(self.agent_pools_secs)
    }

    pub fn default_call(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            FleetCacheError::Configuration(format!("failed to parse cache config: {e}"))
        })
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FleetCacheError::Configuration(format!("failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(DISABLE_CACHING_ENV) {
            self.disable_caching = parse_bool(&raw).ok_or_else(|| {
                FleetCacheError::Configuration(format!(
                    "{DISABLE_CACHING_ENV} must be a boolean, got {raw:?}"
                ))
            })?;
        }
        Ok(self)
    }

    /// Check the config for values no cache can run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(FleetCacheError::Configuration(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        let t = &self.timeouts;
        if t.scale_sets_secs == 0 || t.agent_pools_secs == 0 || t.default_secs == 0 {
            return Err(FleetCacheError::Configuration(
                "remote call timeouts must be greater than zero".to_string(),
            ));
        }
        if self.enable_vms_agent_pool
            && (self.cluster_name.is_empty() || self.cluster_resource_group.is_empty())
        {
            return Err(FleetCacheError::Configuration(
                "enable_vms_agent_pool requires cluster_name and cluster_resource_group"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Snapshot time-to-live.
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Per-group instance-cache time-to-live.
    pub fn instance_ttl(&self) -> Duration {
        Duration::from_secs(self.instance_cache_ttl_secs)
    }

    /// Per-group refresh jitter window.
    pub fn jitter_window(&self) -> Duration {
        Duration::from_secs(self.instance_cache_jitter_secs)
    }

    /// Select the direct (uncached) engine.
    pub fn disable_caching(mut self, disabled: bool) -> Self {
        self.disable_caching = disabled;
        self
    }

    /// Set the snapshot time-to-live (whole seconds).
    pub fn refresh_interval(mut self, ttl: Duration) -> Self {
        self.refresh_interval_secs = ttl.as_secs();
        self
    }

    /// Set the per-group instance-cache time-to-live (whole seconds).
    pub fn instance_cache_ttl(mut self, ttl: Duration) -> Self {
        self.instance_cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the per-group refresh jitter window (whole seconds).
    pub fn instance_cache_jitter(mut self, window: Duration) -> Self {
        self.instance_cache_jitter_secs = window.as_secs();
        self
    }

    /// Enable listing of instance-backed agent pools.
    pub fn enable_vms_agent_pool(mut self, enabled: bool) -> Self {
        self.enable_vms_agent_pool = enabled;
        self
    }

    pub fn resource_group(mut self, name: impl Into<String>) -> Self {
        self.resource_group = name.into();
        self
    }

    /// Scope agent-pool listing to a managed cluster.
    pub fn cluster(
        mut self,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.cluster_resource_group = resource_group.into();
        self.cluster_name = name.into();
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
