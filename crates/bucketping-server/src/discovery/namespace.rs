//! Namespace Manager
//!
//! Resolves the namespace all clusters of a deployment share. Lookup and
//! creation failures are fatal and carry a reason that tells the operator
//! whether to pick another name or fix access control.

use crate::error::{DiscoveryError, DiscoveryResult, NamespaceUnavailableReason};
use crate::observability::events;
use crate::store::{Namespace, ObjectStore, PlacementPolicy, StoreError};
use tracing::{debug, error};

fn lookup_error(name: &str, e: StoreError) -> DiscoveryError {
    match e {
        StoreError::PermissionDenied(msg) => DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::AccessDenied,
            msg,
        ),
        other => DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::Backend,
            other.to_string(),
        ),
    }
}

fn create_error(name: &str, e: StoreError) -> DiscoveryError {
    match e {
        StoreError::Conflict(msg) => DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::CreateConflict,
            msg,
        ),
        StoreError::PermissionDenied(msg) => DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::AccessDenied,
            msg,
        ),
        other => DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::Backend,
            other.to_string(),
        ),
    }
}

/// Fetch the namespace, creating it with `placement` if absent and allowed.
///
/// A create conflict is not retried: namespace names must be unique to the
/// deployer.
pub(super) async fn ensure(
    store: &dyn ObjectStore,
    name: &str,
    placement: &PlacementPolicy,
    auto_create: bool,
) -> DiscoveryResult<Namespace> {
    if name.trim().is_empty() {
        return Err(DiscoveryError::InvalidArgument(
            "namespace name must not be empty",
        ));
    }

    let existing = store
        .get_namespace(name)
        .await
        .map_err(|e| lookup_error(name, e))?;

    if let Some(ns) = existing {
        debug!(namespace = %ns.name, placement = %ns.placement, "Using existing namespace");
        events::namespace_ready(&ns.name, &ns.placement.to_string(), false, store.backend_name());
        return Ok(ns);
    }

    if !auto_create {
        error!(namespace = %name, "Namespace does not exist and auto-create is disabled");
        return Err(DiscoveryError::namespace_unavailable(
            name,
            NamespaceUnavailableReason::Missing,
            "namespace does not exist and auto-create is disabled",
        ));
    }

    let ns = store
        .create_namespace(name, placement)
        .await
        .map_err(|e| create_error(name, e))?;

    events::namespace_ready(&ns.name, &ns.placement.to_string(), true, store.backend_name());
    Ok(ns)
}
