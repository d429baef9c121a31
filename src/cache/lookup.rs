//! Owner-lookup rules shared by both engines.
//!
//! Before searching registered groups, a lookup may decide that an id can
//! never belong to one of them. Both engines apply the same rules; they
//! differ only in where the listings come from.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::group::NodeGroup;
use crate::remote::fetch::with_deadline;
use crate::types::{ScaleSetMap, VmKind, is_virtual_machine_id};

/// Why a lookup answered "not ours" without searching groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shortcut {
    /// Scale-set-backed cluster, every scale set uniform, and the id is a
    /// standalone virtual machine: no group can hold it.
    NotScaleSetManaged,
    /// Standalone cluster and the id is not a standalone virtual machine.
    NotVirtualMachine,
}

/// Whether the scale-set shortcut applies, i.e. whether the lookup needs
/// the scale-set listing at all.
pub(crate) fn needs_scale_sets(vm_kind: VmKind, has_vms_pools: bool) -> bool {
    vm_kind == VmKind::ScaleSetBacked && !has_vms_pools
}

/// The shortcut that applies to `resource_id`, if any.
///
/// `scale_sets` is only consulted when [`needs_scale_sets`] holds.
pub(crate) fn shortcut(
    resource_id: &str,
    vm_kind: VmKind,
    has_vms_pools: bool,
    scale_sets: &ScaleSetMap,
) -> Option<Shortcut> {
    match vm_kind {
        VmKind::ScaleSetBacked if needs_scale_sets(vm_kind, has_vms_pools) => {
            let all_uniform = scale_sets.values().all(|s| !s.is_flexible());
            (all_uniform && is_virtual_machine_id(resource_id))
                .then_some(Shortcut::NotScaleSetManaged)
        }
        VmKind::Standalone if !is_virtual_machine_id(resource_id) => {
            Some(Shortcut::NotVirtualMachine)
        }
        _ => None,
    }
}

/// First group whose members include `resource_id`.
///
/// Groups whose listing fails or misses `deadline` are skipped.
pub(crate) async fn scan_groups(
    groups: &[Arc<dyn NodeGroup>],
    resource_id: &str,
    deadline: Duration,
) -> Option<Arc<dyn NodeGroup>> {
    for group in groups {
        match with_deadline("list_group_instances", deadline, group.nodes()).await {
            Ok(nodes) => {
                if nodes.iter().any(|n| n.matches(resource_id)) {
                    return Some(group.clone());
                }
            }
            Err(e) => {
                debug!(group = group.id(), error = %e, "skipping node group, listing failed");
            }
        }
    }
    None
}
