//! Object Store Collaborator
//!
//! The discovery core only needs put/get/list/delete of opaque blobs inside a
//! named namespace, plus the ability to look up or create that namespace.
//! Backends are interchangeable and selected at construction:
//! - `memory`: in-process store with fault injection, used by tests
//! - `opendal`: Apache OpenDAL operator (filesystem, in-memory, GCS)

mod memory;
mod opendal_store;

pub use self::memory::MemoryStore;
pub use self::opendal_store::OpendalStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Replication class requested when a namespace is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Single-region placement
    #[default]
    Regional,
    /// Replicated across a wider region (`eu`, `us`, `asia`, ...)
    MultiRegional { region: String },
}

impl PlacementPolicy {
    /// Unset region selects the default regional class
    pub fn from_region(region: Option<&str>) -> Self {
        match region {
            Some(r) if !r.trim().is_empty() => Self::MultiRegional {
                region: r.trim().to_string(),
            },
            _ => Self::Regional,
        }
    }
}

impl fmt::Display for PlacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regional => write!(f, "regional"),
            Self::MultiRegional { region } => write!(f, "multi_regional({region})"),
        }
    }
}

/// Handle to an existing namespace ("bucket")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub placement: PlacementPolicy,
}

impl Namespace {
    pub fn new(name: impl Into<String>, placement: PlacementPolicy) -> Self {
        Self {
            name: name.into(),
            placement,
        }
    }
}

/// Failures reported by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller lacks permission on the namespace or object
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Namespace name is already owned by someone else
    #[error("namespace conflict: {0}")]
    Conflict(String),

    /// Namespace handle refers to a namespace that no longer exists
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Anything else the backend reports
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Storage collaborator used by the discovery core.
///
/// Implementations must be safe to call concurrently; the discovery core holds
/// no lock around these calls.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Fetch a namespace, `None` if it does not exist
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError>;

    /// Create a namespace with the given placement
    async fn create_namespace(
        &self,
        name: &str,
        placement: &PlacementPolicy,
    ) -> Result<Namespace, StoreError>;

    /// Write or overwrite an object
    async fn put(&self, ns: &Namespace, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Read an object, `None` if absent
    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Keys starting with `prefix`, in lexicographic order
    async fn list(&self, ns: &Namespace, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete an object, returning whether something was removed
    async fn delete(&self, ns: &Namespace, key: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_from_region() {
        assert_eq!(PlacementPolicy::from_region(None), PlacementPolicy::Regional);
        assert_eq!(PlacementPolicy::from_region(Some("  ")), PlacementPolicy::Regional);
        assert_eq!(
            PlacementPolicy::from_region(Some("eu")),
            PlacementPolicy::MultiRegional {
                region: "eu".to_string()
            }
        );
    }

    #[test]
    fn test_placement_display() {
        assert_eq!(PlacementPolicy::Regional.to_string(), "regional");
        assert_eq!(
            PlacementPolicy::from_region(Some("asia")).to_string(),
            "multi_regional(asia)"
        );
    }
}
