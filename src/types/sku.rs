//! Compute SKU metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Resource type of virtual-machine SKUs.
pub const VIRTUAL_MACHINES_RESOURCE_TYPE: &str = "virtualMachines";

/// Hardware descriptor of one SKU, as offered in one or more locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuRecord {
    /// SKU name, e.g. `Standard_D4s_v5`.
    pub name: String,
    /// Resource type the SKU applies to, e.g. `virtualMachines`.
    pub resource_type: String,
    /// Locations the SKU is offered in.
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub family: Option<String>,
    /// Raw capability name/value pairs (`vCPUs`, `MemoryGB`, `GPUs`, ...).
    #[serde(default)]
    pub capabilities: HashMap<String, String>,
}

impl SkuRecord {
    /// A virtual-machine SKU offered in `location`.
    pub fn virtual_machine(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: VIRTUAL_MACHINES_RESOURCE_TYPE.to_string(),
            locations: vec![location.into()],
            family: None,
            capabilities: HashMap::new(),
        }
    }

    pub fn with_capability(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.capabilities.insert(name.into(), value.into());
        self
    }

    pub fn capability(&self, name: &str) -> Option<&str> {
        self.capabilities.get(name).map(String::as_str)
    }

    pub fn vcpus(&self) -> Option<u32> {
        self.capability("vCPUs")?.parse().ok()
    }

    pub fn memory_gb(&self) -> Option<f64> {
        self.capability("MemoryGB")?.parse().ok()
    }

    pub fn gpus(&self) -> Option<u32> {
        self.capability("GPUs")?.parse().ok()
    }

    /// Whether this record answers a lookup for `name` of `resource_type`
    /// in `location`. Names and locations compare case-insensitively.
    pub fn matches(&self, name: &str, resource_type: &str, location: &str) -> bool {
        self.resource_type.eq_ignore_ascii_case(resource_type)
            && self.name.eq_ignore_ascii_case(name)
            && self
                .locations
                .iter()
                .any(|l| l.eq_ignore_ascii_case(location))
    }
}
