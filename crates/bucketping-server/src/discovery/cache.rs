//! Peer info cache
//!
//! Side output of discovery: maps each remote member to the logical name and
//! physical address it last published, so the membership layer can address it
//! directly. Entries only ever gain information; a descriptor without a
//! logical name or physical address leaves the cached value in place.

use bucketping_core::{MemberAddress, MemberDescriptor};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cached contact details for one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub logical_name: Option<String>,
    pub physical_address: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// Shared address -> peer info map
#[derive(Debug, Clone, Default)]
pub struct PeerCache {
    peers: Arc<RwLock<HashMap<MemberAddress, PeerInfo>>>,
}

impl PeerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a discovered descriptor into the cache
    pub async fn record(&self, descriptor: &MemberDescriptor) {
        let mut peers = self.peers.write().await;
        let now = Utc::now();
        let entry = peers.entry(descriptor.address).or_insert_with(|| PeerInfo {
            logical_name: None,
            physical_address: None,
            last_seen: now,
        });
        if let Some(name) = &descriptor.logical_name {
            entry.logical_name = Some(name.clone());
        }
        if let Some(addr) = &descriptor.physical_address {
            entry.physical_address = Some(addr.clone());
        }
        entry.last_seen = now;
    }

    pub async fn get(&self, address: &MemberAddress) -> Option<PeerInfo> {
        self.peers.read().await.get(address).cloned()
    }

    pub async fn remove(&self, address: &MemberAddress) -> Option<PeerInfo> {
        self.peers.write().await.remove(address)
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> HashMap<MemberAddress, PeerInfo> {
        self.peers.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_merge() {
        let cache = PeerCache::new();
        let addr = MemberAddress::random();

        cache
            .record(
                &MemberDescriptor::new(addr)
                    .with_logical_name("n2")
                    .with_physical_address("10.0.0.2:7800"),
            )
            .await;
        // A sparser descriptor keeps what is already known
        cache.record(&MemberDescriptor::new(addr)).await;

        let info = cache.get(&addr).await.unwrap();
        assert_eq!(info.logical_name.as_deref(), Some("n2"));
        assert_eq!(info.physical_address.as_deref(), Some("10.0.0.2:7800"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = PeerCache::new();
        let addr = MemberAddress::random();
        cache.record(&MemberDescriptor::new(addr)).await;
        assert!(cache.remove(&addr).await.is_some());
        assert!(cache.is_empty().await);
    }
}
