//! Descriptor Writer

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::observability::{events, metrics};
use crate::store::{Namespace, ObjectStore};
use bucketping_core::{encode_descriptors, storage_key, MemberAddress, MemberDescriptor};
use tracing::{debug, trace};

/// Encode `descriptors` and overwrite the member's object unconditionally.
///
/// No version check: the last writer wins, including a slow writer that lands
/// after a concurrent retract.
pub(super) async fn write(
    store: &dyn ObjectStore,
    ns: &Namespace,
    cluster: &str,
    member: &MemberAddress,
    descriptors: &[MemberDescriptor],
) -> DiscoveryResult<()> {
    if cluster.is_empty() {
        return Err(DiscoveryError::InvalidArgument(
            "cluster name must not be empty",
        ));
    }
    if descriptors.is_empty() {
        return Err(DiscoveryError::InvalidArgument(
            "descriptor list must not be empty",
        ));
    }

    let key = storage_key(cluster, member);
    trace!(cluster = %cluster, key = %key, member = %member.short(), "Writing descriptor");

    let result = match encode_descriptors(descriptors) {
        Ok(bytes) => store
            .put(ns, &key, bytes)
            .await
            .map_err(|source| DiscoveryError::Write {
                key: key.clone(),
                source,
            }),
        Err(source) => Err(DiscoveryError::Encode {
            key: key.clone(),
            source,
        }),
    };

    match &result {
        Ok(()) => {
            metrics::record_publish(cluster, "ok");
            events::descriptor_published(cluster, &key, descriptors.len());
        }
        Err(e) => {
            metrics::record_publish(cluster, e.label());
            debug!(cluster = %cluster, key = %key, error = %e, "Descriptor write failed");
        }
    }

    result
}
