//! Per-group instance cache.
//!
//! Each [`InstanceCache`] holds the last member listing of one group. The
//! listing expires after the configured TTL plus a random jitter; a
//! scaling operation on the group invalidates it immediately. Refreshes are
//! single-flight: concurrent readers of a stale entry wait for one fetch
//! and then all see its result.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::jitter::{JitterSource, RandomJitter};
use crate::Result;
use crate::config::CacheConfig;
use crate::telemetry;
use crate::types::InstanceRecord;

/// Observable state of an [`InstanceCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceCacheState {
    /// No listing fetched yet.
    Uninitialized,
    /// Listing present and within its deadline.
    Fresh,
    /// Listing present but past its deadline.
    Stale,
    /// A fetch is in flight.
    Refreshing,
    /// Listing dropped by a scaling operation; the next read refetches.
    Invalidated,
}

#[derive(Debug, Default)]
struct Entry {
    instances: Option<Arc<Vec<InstanceRecord>>>,
    refreshed_at: Option<Instant>,
    expires_at: Option<Instant>,
    invalidated: bool,
    refreshing: bool,
}

impl Entry {
    fn fresh(&self, now: Instant) -> Option<Arc<Vec<InstanceRecord>>> {
        if self.invalidated {
            return None;
        }
        match (&self.instances, self.expires_at) {
            (Some(instances), Some(expires_at)) if now < expires_at => Some(instances.clone()),
            _ => None,
        }
    }
}

/// Cached member listing of one group.
#[derive(Debug)]
pub struct InstanceCache {
    ttl: Duration,
    jitter_window: Duration,
    jitter: Arc<dyn JitterSource>,
    entry: RwLock<Entry>,
    refresh: Mutex<()>,
}

impl InstanceCache {
    pub fn new(ttl: Duration, jitter_window: Duration, jitter: Arc<dyn JitterSource>) -> Self {
        Self {
            ttl,
            jitter_window,
            jitter,
            entry: RwLock::new(Entry::default()),
            refresh: Mutex::new(()),
        }
    }

    /// TTL and jitter window from `config`, random jitter.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.instance_ttl(),
            config.jitter_window(),
            Arc::new(RandomJitter),
        )
    }

    pub fn state(&self) -> InstanceCacheState {
        let entry = self.read();
        if entry.refreshing {
            InstanceCacheState::Refreshing
        } else if entry.instances.is_none() {
            InstanceCacheState::Uninitialized
        } else if entry.invalidated {
            InstanceCacheState::Invalidated
        } else if entry.fresh(Instant::now()).is_some() {
            InstanceCacheState::Fresh
        } else {
            InstanceCacheState::Stale
        }
    }

    /// When the current listing was fetched.
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.read().refreshed_at
    }

    /// When the current listing expires.
    pub fn expires_at(&self) -> Option<Instant> {
        self.read().expires_at
    }

    /// Drop the current listing; the next read fetches.
    pub fn invalidate(&self) {
        let mut entry = self.write();
        entry.invalidated = true;
        debug!("instance cache invalidated");
    }

    /// The cached listing if fresh, otherwise the result of one `fetch`
    /// shared by every concurrent caller.
    ///
    /// A failed fetch leaves the previous listing and its deadline in
    /// place and is returned to the caller that issued it; callers queued
    /// behind it retry.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<InstanceRecord>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<InstanceRecord>>>,
    {
        if let Some(hit) = self.cached() {
            return Ok(hit);
        }

        let _flight = self.refresh.lock().await;
        if let Some(hit) = self.cached() {
            return Ok(hit);
        }

        let result = {
            let _refreshing = RefreshingFlag::raise(&self.entry);
            fetch().await
        };

        match result {
            Ok(instances) => {
                let instances = Arc::new(instances);
                let now = Instant::now();
                let jitter = self.jitter.offset(self.jitter_window);
                let mut entry = self.write();
                entry.instances = Some(instances.clone());
                entry.refreshed_at = Some(now);
                entry.expires_at = Some(now + self.ttl + jitter);
                entry.invalidated = false;
                drop(entry);
                metrics::counter!(telemetry::INSTANCE_CACHE_FETCHES_TOTAL, "status" => "ok")
                    .increment(1);
                debug!(
                    instances = instances.len(),
                    ttl_secs = self.ttl.as_secs(),
                    jitter_ms = jitter.as_millis() as u64,
                    "instance cache refreshed"
                );
                Ok(instances)
            }
            Err(e) => {
                metrics::counter!(telemetry::INSTANCE_CACHE_FETCHES_TOTAL, "status" => "error")
                    .increment(1);
                warn!(error = %e, "instance cache refresh failed");
                Err(e)
            }
        }
    }

    fn cached(&self) -> Option<Arc<Vec<InstanceRecord>>> {
        let entry = self.read();
        entry.fresh(Instant::now())
    }

    fn read(&self) -> RwLockReadGuard<'_, Entry> {
        self.entry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entry> {
        self.entry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the entry as refreshing for as long as it lives, including when
/// the fetch future is dropped mid-flight.
struct RefreshingFlag<'a> {
    entry: &'a RwLock<Entry>,
}

impl<'a> RefreshingFlag<'a> {
    fn raise(entry: &'a RwLock<Entry>) -> Self {
        entry.write().unwrap_or_else(PoisonError::into_inner).refreshing = true;
        Self { entry }
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.entry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing = false;
    }
}
