//! Published fleet snapshots.
//!
//! A [`Snapshot`] is an immutable view: the three listings plus the
//! instance-to-group index derived from them. Readers clone the current
//! `Arc<Snapshot>` and never observe a half-built view; a refresh builds a
//! complete candidate off to the side and swaps it in.
//!
//! The store also owns the unowned-instance set (ids known to belong to no
//! registered group). Entries are tagged with the generation they were
//! computed against, so a lookup that raced a publish cannot leave a stale
//! "not ours" answer behind.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::time::{Duration, Instant};

use crate::group::NodeGroup;
use crate::types::{AgentPoolMap, ScaleSetMap, VirtualMachineMap};

/// Immutable view of the fleet at one refresh.
#[derive(Clone, Default)]
pub struct Snapshot {
    generation: u64,
    scale_sets: Arc<ScaleSetMap>,
    virtual_machines: Arc<VirtualMachineMap>,
    vms_pools: Arc<AgentPoolMap>,
    instance_to_group: HashMap<String, Arc<dyn NodeGroup>>,
}

impl Snapshot {
    /// A candidate view. Its generation is assigned on publish.
    pub(crate) fn new(
        scale_sets: ScaleSetMap,
        virtual_machines: VirtualMachineMap,
        vms_pools: AgentPoolMap,
        instance_to_group: HashMap<String, Arc<dyn NodeGroup>>,
    ) -> Self {
        Self {
            generation: 0,
            scale_sets: Arc::new(scale_sets),
            virtual_machines: Arc::new(virtual_machines),
            vms_pools: Arc::new(vms_pools),
            instance_to_group,
        }
    }

    /// Publish counter; 0 for the empty view a cache starts with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scale_sets(&self) -> &Arc<ScaleSetMap> {
        &self.scale_sets
    }

    pub fn virtual_machines(&self) -> &Arc<VirtualMachineMap> {
        &self.virtual_machines
    }

    pub fn vms_pools(&self) -> &Arc<AgentPoolMap> {
        &self.vms_pools
    }

    /// Owning group of the instance keyed `key` (see `instance_key`).
    pub(crate) fn group_for(&self, key: &str) -> Option<Arc<dyn NodeGroup>> {
        self.instance_to_group.get(key).cloned()
    }

    /// Number of indexed instances.
    pub fn indexed_instances(&self) -> usize {
        self.instance_to_group.len()
    }
}

struct StoreState {
    current: Arc<Snapshot>,
    unowned: HashSet<String>,
    last_refresh: Option<Instant>,
    /// Bumped by every invalidation; a refresh that started before an
    /// invalidation publishes its data but does not count as fresh.
    invalidations: u64,
    /// Bumped whenever `unowned` is cleared. A negative result computed
    /// under an older value is dropped.
    unowned_epoch: u64,
}

/// Holder of the current snapshot and the unowned-instance set.
pub(crate) struct SnapshotStore {
    state: RwLock<StoreState>,
}

impl SnapshotStore {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                current: Arc::new(Snapshot::default()),
                unowned: HashSet::new(),
                last_refresh: None,
                invalidations: 0,
                unowned_epoch: 0,
            }),
        }
    }

    pub(crate) fn current(&self) -> Arc<Snapshot> {
        self.read().current.clone()
    }

    /// The current snapshot together with the unowned epoch a lookup
    /// against it must hand back to [`mark_unowned`](Self::mark_unowned).
    pub(crate) fn view(&self) -> (Arc<Snapshot>, u64) {
        let state = self.read();
        (state.current.clone(), state.unowned_epoch)
    }

    pub(crate) fn last_refresh(&self) -> Option<Instant> {
        self.read().last_refresh
    }

    /// Whether the last refresh happened less than `ttl` before `now`.
    pub(crate) fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.read()
            .last_refresh
            .is_some_and(|at| now.saturating_duration_since(at) < ttl)
    }

    /// Current invalidation epoch; pass it back to [`publish`](Self::publish).
    pub(crate) fn epoch(&self) -> u64 {
        self.read().invalidations
    }

    /// Swap in `candidate` as the current view and clear the unowned set.
    /// Returns the new generation.
    pub(crate) fn publish(&self, candidate: Snapshot, refreshed_at: Instant, epoch: u64) -> u64 {
        let mut state = self.write();
        let generation = state.current.generation + 1;
        state.current = Arc::new(Snapshot {
            generation,
            ..candidate
        });
        state.unowned.clear();
        state.unowned_epoch += 1;
        state.last_refresh = (state.invalidations == epoch).then_some(refreshed_at);
        generation
    }

    /// Make the next read refresh.
    pub(crate) fn invalidate(&self) {
        let mut state = self.write();
        state.last_refresh = None;
        state.invalidations += 1;
    }

    pub(crate) fn is_unowned(&self, key: &str) -> bool {
        self.read().unowned.contains(key)
    }

    /// Record `key` as unowned, unless the set was cleared after `epoch`
    /// was read (a publish, reset or registration change).
    pub(crate) fn mark_unowned(&self, key: String, epoch: u64) -> bool {
        let mut state = self.write();
        if state.unowned_epoch != epoch {
            return false;
        }
        state.unowned.insert(key)
    }

    pub(crate) fn clear_unowned(&self) {
        let mut state = self.write();
        state.unowned.clear();
        state.unowned_epoch += 1;
    }

    pub(crate) fn unowned_len(&self) -> usize {
        self.read().unowned.len()
    }

    /// Drop everything: empty view, empty unowned set, no refresh time.
    pub(crate) fn reset(&self) {
        let mut state = self.write();
        let generation = state.current.generation + 1;
        state.current = Arc::new(Snapshot {
            generation,
            ..Snapshot::default()
        });
        state.unowned.clear();
        state.unowned_epoch += 1;
        state.last_refresh = None;
        state.invalidations += 1;
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
