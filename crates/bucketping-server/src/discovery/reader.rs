//! Descriptor Reader
//!
//! One discovery round: list the cluster prefix, fetch every descriptor
//! object, decode it and merge the descriptors into a collector. Objects that
//! vanish between list and fetch are skipped silently; objects that fail to
//! fetch or decode are recorded and skipped so one bad object never hides the
//! rest of the cluster.

use super::cache::PeerCache;
use super::responses::{ResponseCollector, ResponseSet};
use super::ObjectFailure;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::observability::metrics;
use crate::store::{Namespace, ObjectStore};
use bucketping_core::{cluster_prefix, decode_descriptors, MemberAddress, SUFFIX};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, error, trace, warn};

/// Objects fetched in parallel within a round
const FETCH_CONCURRENCY: usize = 8;

/// Result of one discovery round
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub responses: ResponseSet,
    /// Objects skipped because they could not be fetched or decoded
    pub failures: Vec<ObjectFailure>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub(super) struct ReadContext<'a> {
    pub store: &'a dyn ObjectStore,
    pub namespace: &'a Namespace,
    pub local_address: Option<&'a MemberAddress>,
    pub peer_cache: &'a PeerCache,
}

pub(super) async fn read_into<C>(
    ctx: &ReadContext<'_>,
    cluster: &str,
    filter: Option<&HashSet<MemberAddress>>,
    collector: &mut C,
) -> DiscoveryResult<Vec<ObjectFailure>>
where
    C: ResponseCollector + ?Sized,
{
    let prefix = cluster_prefix(cluster);
    let keys = ctx
        .store
        .list(ctx.namespace, &prefix)
        .await
        .map_err(|source| {
            error!(cluster = %cluster, prefix = %prefix, error = %source, "Failed listing descriptors");
            DiscoveryError::List {
                prefix: prefix.clone(),
                source,
            }
        })?;

    let store = ctx.store;
    let ns = ctx.namespace;
    let fetched: Vec<_> = stream::iter(keys.into_iter().filter(|k| k.ends_with(SUFFIX)))
        .map(|key| async move {
            trace!(namespace = %ns.name, key = %key, "Reading descriptor");
            let result = store.get(ns, &key).await;
            (key, result)
        })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut failures = Vec::new();
    let mut accepted = 0usize;

    for (key, result) in fetched {
        let bytes = match result {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes,
            Ok(_) => {
                trace!(key = %key, "Descriptor vanished before read, skipping");
                continue;
            }
            Err(source) => {
                warn!(cluster = %cluster, key = %key, error = %source, "Failed fetching descriptor");
                metrics::record_object_failure(cluster, "fetch");
                failures.push(ObjectFailure {
                    key: key.clone(),
                    error: DiscoveryError::Fetch { key, source },
                });
                continue;
            }
        };

        let descriptors = match decode_descriptors(&bytes) {
            Ok(list) => list,
            Err(source) => {
                error!(cluster = %cluster, key = %key, error = %source, "Failed unmarshalling descriptor");
                metrics::record_object_failure(cluster, "decode");
                failures.push(ObjectFailure {
                    key: key.clone(),
                    error: DiscoveryError::Decode { key, source },
                });
                continue;
            }
        };

        for descriptor in descriptors {
            if let Some(local) = ctx.local_address {
                if descriptor.address != *local {
                    ctx.peer_cache.record(&descriptor).await;
                }
            }

            if filter.map_or(true, |members| members.contains(&descriptor.address)) {
                let is_coordinator = descriptor.is_coordinator;
                collector.add_response(descriptor, is_coordinator);
                accepted += 1;
            }
        }
    }

    debug!(
        cluster = %cluster,
        accepted = accepted,
        skipped = failures.len(),
        "Discovery round complete"
    );
    Ok(failures)
}
