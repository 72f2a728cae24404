//! Leave / Cleanup
//!
//! Neither operation touches the namespace itself.

use super::ObjectFailure;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::observability::{events, metrics};
use crate::store::{Namespace, ObjectStore};
use bucketping_core::{cluster_prefix, storage_key, MemberAddress, SUFFIX};
use tracing::{trace, warn};

/// Outcome of a cluster purge
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Objects actually removed
    pub deleted: usize,
    /// Objects whose deletion failed; the purge carried on past them
    pub failures: Vec<ObjectFailure>,
}

impl PurgeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete one member's object. Deleting an absent key returns `false`.
pub(super) async fn remove(
    store: &dyn ObjectStore,
    ns: &Namespace,
    cluster: &str,
    member: &MemberAddress,
) -> DiscoveryResult<bool> {
    if cluster.is_empty() {
        return Err(DiscoveryError::InvalidArgument(
            "cluster name must not be empty",
        ));
    }

    let key = storage_key(cluster, member);
    match store.delete(ns, &key).await {
        Ok(removed) => {
            if removed {
                trace!(namespace = %ns.name, key = %key, "Removed descriptor");
            }
            metrics::record_retract(cluster, if removed { "removed" } else { "absent" });
            events::descriptor_retracted(cluster, &key, removed);
            Ok(removed)
        }
        Err(source) => {
            metrics::record_retract(cluster, "error");
            Err(DiscoveryError::Delete { key, source })
        }
    }
}

/// Delete every descriptor object under the cluster prefix.
///
/// Only a failed listing fails the call; individual delete failures are
/// logged and collected.
pub(super) async fn remove_all(
    store: &dyn ObjectStore,
    ns: &Namespace,
    cluster: &str,
) -> DiscoveryResult<PurgeReport> {
    let mut report = PurgeReport::default();
    if cluster.is_empty() {
        return Ok(report);
    }

    let prefix = cluster_prefix(cluster);
    let keys = store
        .list(ns, &prefix)
        .await
        .map_err(|source| DiscoveryError::List {
            prefix: prefix.clone(),
            source,
        })?;

    for key in keys.into_iter().filter(|k| k.ends_with(SUFFIX)) {
        trace!(namespace = %ns.name, key = %key, "Deleting descriptor");
        match store.delete(ns, &key).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => trace!(key = %key, "Descriptor already gone"),
            Err(source) => {
                warn!(cluster = %cluster, key = %key, error = %source, "Failed to delete descriptor");
                report.failures.push(ObjectFailure {
                    key: key.clone(),
                    error: DiscoveryError::Delete { key, source },
                });
            }
        }
    }

    metrics::record_purge(cluster, report.deleted);
    events::cluster_purged(cluster, report.deleted, report.failures.len());
    Ok(report)
}
