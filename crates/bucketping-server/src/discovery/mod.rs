//! Storage-backed Discovery Protocol
//!
//! Members of a cluster find each other through a shared object store:
//! 1. Namespace: look up (or create) the deployment's namespace
//! 2. Publish: write the local descriptor list to `<cluster>/<member>.list`
//! 3. Discover: list `<cluster>/`, fetch and decode every descriptor object
//! 4. Cleanup: delete the local object on leave, or purge the whole cluster
//!
//! The store is eventually consistent and no operation holds a lock across
//! calls, so every result is a hint set. Per-object failures are reported in
//! the returned value and never abort a round; only namespace failures are
//! fatal.

mod cache;
mod cleanup;
mod controller;
mod namespace;
mod reader;
mod responses;
mod writer;


pub use cache::{PeerCache, PeerInfo};
pub use cleanup::PurgeReport;
pub use controller::{
    run_discovery_controller, ControllerSettings, DiscoveryCommand, DiscoveryController,
    DiscoveryEvent, DiscoveryState,
};
pub use reader::DiscoveryReport;
pub use responses::{Response, ResponseCollector, ResponseSet};

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::store::{Namespace, ObjectStore, PlacementPolicy};
use async_trait::async_trait;
use bucketping_core::{MemberAddress, MemberDescriptor};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// A storage object that could not be processed
#[derive(Debug)]
pub struct ObjectFailure {
    pub key: String,
    pub error: DiscoveryError,
}

/// Operations the membership layer calls on a discovery backend
#[async_trait]
pub trait DiscoveryProtocol: Send + Sync {
    /// Look up the namespace, creating it when allowed. Failure is fatal.
    async fn ensure_namespace(
        &self,
        name: &str,
        placement: &PlacementPolicy,
        auto_create: bool,
    ) -> DiscoveryResult<Namespace>;

    /// Overwrite the member's object with the given descriptor list
    async fn publish(
        &self,
        cluster: &str,
        member: &MemberAddress,
        descriptors: &[MemberDescriptor],
    ) -> DiscoveryResult<()>;

    /// Run one discovery round
    async fn discover(
        &self,
        cluster: Option<&str>,
        filter: Option<&HashSet<MemberAddress>>,
    ) -> DiscoveryResult<DiscoveryReport>;

    /// Delete the member's object, returning whether one was removed
    async fn retract(&self, cluster: &str, member: &MemberAddress) -> DiscoveryResult<bool>;

    /// Delete every descriptor object of a cluster
    async fn purge_cluster(&self, cluster: &str) -> DiscoveryResult<PurgeReport>;
}

/// Discovery over any [`ObjectStore`] backend
pub struct StorageDiscovery {
    store: Arc<dyn ObjectStore>,
    namespace: RwLock<Option<Namespace>>,
    local_address: Option<MemberAddress>,
    peer_cache: PeerCache,
}

impl StorageDiscovery {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            namespace: RwLock::new(None),
            local_address: None,
            peer_cache: PeerCache::new(),
        }
    }

    /// Identity of the local node; its own descriptors are kept out of the peer cache
    pub fn with_local_address(mut self, address: MemberAddress) -> Self {
        self.local_address = Some(address);
        self
    }

    /// Share a peer cache owned by the membership layer
    pub fn with_peer_cache(mut self, cache: PeerCache) -> Self {
        self.peer_cache = cache;
        self
    }

    pub fn peer_cache(&self) -> &PeerCache {
        &self.peer_cache
    }

    pub fn local_address(&self) -> Option<&MemberAddress> {
        self.local_address.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Namespace resolved by the last successful `ensure_namespace`
    pub async fn namespace(&self) -> DiscoveryResult<Namespace> {
        self.namespace
            .read()
            .await
            .clone()
            .ok_or(DiscoveryError::NotInitialized)
    }

    /// Run one discovery round, feeding a caller-supplied collector
    pub async fn discover_into<C>(
        &self,
        cluster: Option<&str>,
        filter: Option<&HashSet<MemberAddress>>,
        collector: &mut C,
    ) -> DiscoveryResult<Vec<ObjectFailure>>
    where
        C: ResponseCollector + ?Sized,
    {
        let cluster = match cluster {
            Some(c) if !c.is_empty() => c,
            _ => return Ok(Vec::new()),
        };
        let ns = self.namespace().await?;
        let started = Instant::now();
        let ctx = reader::ReadContext {
            store: self.store.as_ref(),
            namespace: &ns,
            local_address: self.local_address.as_ref(),
            peer_cache: &self.peer_cache,
        };
        let result = reader::read_into(&ctx, cluster, filter, collector).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        crate::observability::metrics::record_discovery_round(cluster, outcome, started.elapsed());
        result
    }
}

#[async_trait]
impl DiscoveryProtocol for StorageDiscovery {
    async fn ensure_namespace(
        &self,
        name: &str,
        placement: &PlacementPolicy,
        auto_create: bool,
    ) -> DiscoveryResult<Namespace> {
        let ns = namespace::ensure(self.store.as_ref(), name, placement, auto_create).await?;
        *self.namespace.write().await = Some(ns.clone());
        Ok(ns)
    }

    async fn publish(
        &self,
        cluster: &str,
        member: &MemberAddress,
        descriptors: &[MemberDescriptor],
    ) -> DiscoveryResult<()> {
        let ns = self.namespace().await?;
        writer::write(self.store.as_ref(), &ns, cluster, member, descriptors).await
    }

    async fn discover(
        &self,
        cluster: Option<&str>,
        filter: Option<&HashSet<MemberAddress>>,
    ) -> DiscoveryResult<DiscoveryReport> {
        let mut responses = ResponseSet::new();
        let failures = self.discover_into(cluster, filter, &mut responses).await?;
        if let Some(c) = cluster.filter(|c| !c.is_empty()) {
            crate::observability::metrics::set_peer_count(c, responses.len());
        }
        Ok(DiscoveryReport {
            responses,
            failures,
        })
    }

    async fn retract(&self, cluster: &str, member: &MemberAddress) -> DiscoveryResult<bool> {
        let ns = self.namespace().await?;
        cleanup::remove(self.store.as_ref(), &ns, cluster, member).await
    }

    async fn purge_cluster(&self, cluster: &str) -> DiscoveryResult<PurgeReport> {
        let ns = self.namespace().await?;
        cleanup::remove_all(self.store.as_ref(), &ns, cluster).await
    }
}
