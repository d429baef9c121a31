//! Resource references and resource-path patterns.
//!
//! Fleet resources are addressed by paths of the form
//! `/subscriptions/<sub>/resourceGroups/<rg>/providers/<namespace>/<type>/<name>`.
//! Node provider ids carry the same path behind an `azure://` scheme.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{FleetCacheError, Result};

/// Scheme prefix of node provider ids.
pub const PROVIDER_ID_SCHEME: &str = "azure://";

static RESOURCE_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i).*/subscriptions/(?:.*)/resourceGroups/(.+)/providers/(?:.*)")
        .expect("resource group pattern is valid")
});

static VIRTUAL_MACHINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^/subscriptions/(?:.*)/resourceGroups/(?:.*)/providers/Microsoft\.Compute/virtualMachines/(.+)$",
    )
    .expect("virtual machine pattern is valid")
});

/// Identifies one remote resource: its resource path and short name.
///
/// The short name is the last path segment, or the whole string when the
/// reference was built from a bare name (as scale sets are looked up).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    id: String,
    name: String,
}

impl ResourceReference {
    /// Build a reference from a resource path (or bare name).
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self { id, name }
    }

    /// Build a reference from a node provider id, dropping the scheme.
    pub fn from_provider_id(provider_id: &str) -> Self {
        Self::new(strip_scheme(provider_id))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical form of this reference's path.
    ///
    /// See [`normalize_resource_id`].
    pub fn normalized_id(&self) -> Result<String> {
        normalize_resource_id(&self.id)
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

fn strip_scheme(id: &str) -> &str {
    match id.get(..PROVIDER_ID_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(PROVIDER_ID_SCHEME) => {
            &id[PROVIDER_ID_SCHEME.len()..]
        }
        _ => id,
    }
}

/// Normalise a resource path: drop a provider-id scheme and lower-case the
/// resource-group segment, which the API treats case-insensitively but
/// reports inconsistently.
///
/// Fails with [`FleetCacheError::InvalidReference`] when `id` is not a
/// resource path.
pub fn normalize_resource_id(id: &str) -> Result<String> {
    let path = strip_scheme(id);
    let captures = RESOURCE_GROUP_RE
        .captures(path)
        .ok_or_else(|| FleetCacheError::InvalidReference {
            reference: id.to_string(),
            reason: "not in resource id format".to_string(),
        })?;
    let group = captures
        .get(1)
        .ok_or_else(|| FleetCacheError::InvalidReference {
            reference: id.to_string(),
            reason: "missing resource group".to_string(),
        })?;
    let mut normalized = String::with_capacity(path.len());
    normalized.push_str(&path[..group.start()]);
    normalized.push_str(&group.as_str().to_lowercase());
    normalized.push_str(&path[group.end()..]);
    Ok(normalized)
}

/// Key used for case-insensitive id sets and maps. Provider-id schemes are
/// dropped so that member ids and resource paths compare equal.
pub(crate) fn instance_key(id: &str) -> String {
    strip_scheme(id).to_ascii_lowercase()
}

/// Whether `id` is the path of a standalone virtual machine.
pub fn is_virtual_machine_id(id: &str) -> bool {
    VIRTUAL_MACHINE_RE.is_match(id)
}
