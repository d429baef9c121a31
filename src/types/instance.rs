//! Member instances of scalable groups.

use serde::{Deserialize, Serialize};

use super::instance_key;

/// Lifecycle state of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    Running,
    Creating,
    Deleting,
}

/// One member instance of a scalable group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Provider id / resource path of the instance.
    pub id: String,
    pub status: Option<InstanceState>,
}

impl InstanceRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: InstanceState) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether this instance is `id`, ignoring case and any provider-id
    /// scheme.
    pub fn matches(&self, id: &str) -> bool {
        instance_key(&self.id) == instance_key(id)
    }
}

/// Which kind of instance a lookup is for.
///
/// Set process-wide from the cluster's node type; it selects which
/// "not one of ours" shortcuts apply before the group search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VmKind {
    /// Nodes are scale-set members.
    ScaleSetBacked,
    /// Nodes are standalone virtual machines.
    Standalone,
}
