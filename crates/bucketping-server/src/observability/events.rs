//! Structured Events
//!
//! Provides structured event logging with consistent fields across the
//! discovery node. Each event type has a dedicated function that ensures
//! consistent field naming.
//!
//! Event types:
//! - `namespace_ready` - Namespace looked up or created
//! - `descriptor_published` - Local descriptor written
//! - `descriptor_retracted` - Local descriptor removed on leave
//! - `cluster_purged` - All descriptors of a cluster removed
//! - `peer_joined` - Peer appeared in a discovery round
//! - `peer_departed` - Peer no longer present in a discovery round

use tracing::{info, warn};

/// Emit a namespace ready event
pub fn namespace_ready(namespace: &str, placement: &str, created: bool, backend: &str) {
    info!(
        event_type = "namespace_ready",
        namespace = %namespace,
        placement = %placement,
        created = created,
        backend = %backend,
        "Namespace ready"
    );
}

/// Emit a descriptor published event
pub fn descriptor_published(cluster: &str, key: &str, descriptor_count: usize) {
    info!(
        event_type = "descriptor_published",
        cluster = %cluster,
        key = %key,
        descriptor_count = descriptor_count,
        "Descriptor published"
    );
}

/// Emit a descriptor retracted event
pub fn descriptor_retracted(cluster: &str, key: &str, removed: bool) {
    info!(
        event_type = "descriptor_retracted",
        cluster = %cluster,
        key = %key,
        removed = removed,
        "Descriptor retracted"
    );
}

/// Emit a cluster purged event
pub fn cluster_purged(cluster: &str, deleted: usize, failed: usize) {
    info!(
        event_type = "cluster_purged",
        cluster = %cluster,
        deleted = deleted,
        failed = failed,
        "Cluster purged"
    );
}

/// Emit a peer joined event
pub fn peer_joined(address: &str, logical_name: &str, cluster: &str) {
    info!(
        event_type = "peer_joined",
        address = %address,
        logical_name = %logical_name,
        cluster = %cluster,
        "Peer joined"
    );
}

/// Emit a peer departed event
pub fn peer_departed(address: &str, cluster: &str) {
    warn!(
        event_type = "peer_departed",
        address = %address,
        cluster = %cluster,
        "Peer departed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_functions_dont_panic() {
        namespace_ready("demo-ns", "regional", true, "memory");
        descriptor_published("grid", "grid/a.list", 1);
        descriptor_retracted("grid", "grid/a.list", true);
        cluster_purged("grid", 3, 1);
        peer_joined("6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c", "n1", "grid");
        peer_departed("6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c", "grid");
    }
}
