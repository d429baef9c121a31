//! Caching subsystem.
//!
//! Two interchangeable engines implement [`ResourceCache`](crate::ResourceCache):
//!
//! - [`CachedResourceCache`]: serves reads from a TTL [`Snapshot`] of the
//!   fleet, with an instance-to-group index and a set of ids known to be
//!   owned by no group. Refreshed by `regenerate`.
//!
//! - [`DirectResourceCache`]: calls the remote API on every read and
//!   remembers nothing but the registered groups.
//!
//! Alongside them:
//!
//! - [`InstanceCache`]: per-group member listing with jittered expiry and
//!   single-flight refresh, used through
//!   [`InstanceCachingGroup`](crate::InstanceCachingGroup).
//!
//! - [`SkuTable`]: location-scoped SKU lookup, shared per location in
//!   cached mode and throw-away in direct mode.

mod cached;
mod direct;
mod instances;
mod jitter;
mod lookup;
mod sku;
mod snapshot;

pub use cached::CachedResourceCache;
pub use direct::DirectResourceCache;
pub use instances::{InstanceCache, InstanceCacheState};
pub use jitter::{FixedJitter, JitterSource, RandomJitter};
pub use sku::SkuTable;
pub use snapshot::Snapshot;
