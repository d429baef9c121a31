//! Registration bookkeeping for scalable groups.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use super::NodeGroup;

/// The set of groups this process manages, unique by id
/// (case-insensitive).
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<Vec<Arc<dyn NodeGroup>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `group`.
    ///
    /// Returns `false` when a group with the same id and the same bounds is
    /// already registered. A group with the same id but different bounds is
    /// replaced in place; an unknown id is appended. Both return `true`.
    pub fn register(&self, group: Arc<dyn NodeGroup>) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = groups
            .iter_mut()
            .find(|g| g.id().eq_ignore_ascii_case(group.id()))
        {
            if existing.min_size() == group.min_size() && existing.max_size() == group.max_size() {
                return false;
            }
            debug!(group = group.id(), "node group updated");
            *existing = group;
            return true;
        }
        debug!(group = group.id(), "registering node group");
        groups.push(group);
        true
    }

    /// Remove every registration whose id matches `id`. Returns whether
    /// anything was removed.
    pub fn unregister(&self, id: &str) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let before = groups.len();
        groups.retain(|g| !g.id().eq_ignore_ascii_case(id));
        let changed = groups.len() != before;
        if changed {
            info!(group = id, "unregistered node group");
        }
        changed
    }

    /// Snapshot of the current registrations, in registration order.
    pub fn list(&self) -> Vec<Arc<dyn NodeGroup>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a group with `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|g| g.id().eq_ignore_ascii_case(id))
    }

    pub fn len(&self) -> usize {
        self.groups.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
