//! SKU lookup tables.
//!
//! A [`SkuTable`] is the SKU listing of one location. The cached engine
//! keeps one table per location in a [`SharedSkuTables`] and reuses it for
//! every lookup; the direct engine builds a table per lookup and drops it.

use std::sync::Arc;

use moka::future::Cache;
use tracing::debug;

use crate::remote::fetch::RemoteFetcher;
use crate::telemetry;
use crate::traits::CacheMode;
use crate::types::{SkuRecord, VIRTUAL_MACHINES_RESOURCE_TYPE};
use crate::{FleetCacheError, Result};

/// Upper bound on cached locations. A cluster lives in one location; the
/// bound only keeps a misbehaving caller from growing the cache forever.
const MAX_LOCATIONS: u64 = 64;

/// Every SKU offered in one location.
#[derive(Debug, Clone)]
pub struct SkuTable {
    location: String,
    skus: Vec<SkuRecord>,
}

impl SkuTable {
    pub fn new(location: impl Into<String>, skus: Vec<SkuRecord>) -> Self {
        Self {
            location: location.into(),
            skus,
        }
    }

    /// Fetch the table for `location`. `mode` labels the load metric.
    pub(crate) async fn load(
        fetcher: &RemoteFetcher,
        location: &str,
        mode: &'static str,
    ) -> Result<Self> {
        let skus = fetcher.skus(location).await?;
        metrics::counter!(telemetry::SKU_TABLE_LOADS_TOTAL, "mode" => mode).increment(1);
        debug!(location, skus = skus.len(), mode, "loaded sku table");
        Ok(Self::new(location, skus))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }

    /// The virtual-machine SKU `name` offered in `location`.
    pub fn virtual_machine(&self, name: &str, location: &str) -> Result<SkuRecord> {
        self.skus
            .iter()
            .find(|s| s.matches(name, VIRTUAL_MACHINES_RESOURCE_TYPE, location))
            .cloned()
            .ok_or_else(|| FleetCacheError::SkuNotFound {
                name: name.to_string(),
                location: location.to_string(),
            })
    }
}

/// Fails for an empty location; SKU tables are always location-scoped.
pub(crate) fn require_location(location: &str) -> Result<()> {
    if location.trim().is_empty() {
        return Err(FleetCacheError::Configuration(
            "location not specified".to_string(),
        ));
    }
    Ok(())
}

/// Lazily loaded tables, one per location (case-insensitive).
///
/// Concurrent first lookups for the same location share one load.
pub(crate) struct SharedSkuTables {
    tables: Cache<String, Arc<SkuTable>>,
}

impl SharedSkuTables {
    pub(crate) fn new() -> Self {
        Self {
            tables: Cache::builder().max_capacity(MAX_LOCATIONS).build(),
        }
    }

    pub(crate) async fn get_or_load(
        &self,
        fetcher: &RemoteFetcher,
        location: &str,
    ) -> Result<Arc<SkuTable>> {
        self.tables
            .try_get_with(location.to_ascii_lowercase(), async {
                SkuTable::load(fetcher, location, CacheMode::Cached.as_str()).await.map(Arc::new)
            })
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    /// Whether any table has been loaded.
    pub(crate) fn has_tables(&self) -> bool {
        self.tables.iter().next().is_some()
    }

    pub(crate) fn clear(&self) {
        self.tables.invalidate_all();
    }
}
