//! fleetcache error types

use std::time::Duration;

/// fleetcache error types
///
/// `Clone` so that a single-flight loader can hand the same failure back to
/// every caller that waited on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FleetCacheError {
    // Reference errors
    #[error("invalid resource reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    // Remote API errors
    #[error("remote call {operation} failed: {message}")]
    RemoteFetch {
        operation: &'static str,
        message: String,
    },

    #[error("remote call {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A registered group could not list its members while the
    /// instance-to-group index was being rebuilt.
    #[error("node group {group} failed to list instances: {message}")]
    GroupListing { group: String, message: String },

    /// Returned by direct mode's `has_instance` when no registered group
    /// claims the id, and by optional [`NodeGroup`](crate::NodeGroup)
    /// operations that an implementation does not provide.
    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sku {name:?} not found in location {location:?}")]
    SkuNotFound { name: String, location: String },
}

impl FleetCacheError {
    /// Shorthand for a [`RemoteFetch`](Self::RemoteFetch) failure.
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            operation,
            message: message.into(),
        }
    }

    /// Whether this error came from talking to the remote API (including a
    /// group's member listing), as opposed to a caller or configuration
    /// mistake.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::RemoteFetch { .. } | Self::Timeout { .. } | Self::GroupListing { .. }
        )
    }
}

/// Result type alias for fleetcache operations
pub type Result<T> = std::result::Result<T, FleetCacheError>;
