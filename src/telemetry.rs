//! Telemetry metric name constants.
//!
//! Centralised metric names for fleetcache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fleetcache_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: remote call issued (e.g. "list_scale_sets", "list_skus")
//! - `status`: outcome: "ok" or "error"
//! - `mode`: cache mode: "cached" or "direct"

/// Total snapshot refreshes that reached the remote API.
///
/// Labels: `status` ("ok" | "error").
pub const SNAPSHOT_REFRESHES_TOTAL: &str = "fleetcache_snapshot_refreshes_total";

/// Duration of a snapshot refresh (fetch + index rebuild + publish), in seconds.
pub const SNAPSHOT_REFRESH_DURATION_SECONDS: &str = "fleetcache_snapshot_refresh_duration_seconds";

/// Total remote API calls.
///
/// Labels: `operation`, `status`.
pub const REMOTE_CALLS_TOTAL: &str = "fleetcache_remote_calls_total";

/// Lookups answered by the unowned-instance (negative-result) set.
pub const UNOWNED_HITS_TOTAL: &str = "fleetcache_unowned_hits_total";

/// Per-group instance-cache fetches.
///
/// Labels: `status`.
pub const INSTANCE_CACHE_FETCHES_TOTAL: &str = "fleetcache_instance_cache_fetches_total";

/// SKU lookup tables built from the remote API.
///
/// Labels: `mode`.
pub const SKU_TABLE_LOADS_TOTAL: &str = "fleetcache_sku_table_loads_total";
