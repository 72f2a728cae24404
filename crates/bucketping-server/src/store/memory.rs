//! In-memory object store
//!
//! Keeps namespaces and objects in process memory. Faults can be injected per
//! namespace or per key so tests can exercise the error paths of the
//! discovery core without a real backend.

use super::{Namespace, ObjectStore, PlacementPolicy, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug)]
struct StoredNamespace {
    placement: PlacementPolicy,
    objects: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct Faults {
    /// Names owned by a third party: lookups are denied, creation conflicts
    foreign: HashSet<String>,
    /// Existing namespaces the caller may not access
    denied: HashSet<String>,
    failing_gets: HashSet<String>,
    failing_deletes: HashSet<String>,
    /// Keys that are listed but gone by the time they are fetched
    vanishing: HashSet<String>,
    fail_puts: bool,
    fail_lists: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    namespaces: HashMap<String, StoredNamespace>,
    faults: Faults,
}

/// Object store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    requests: AtomicUsize,
    namespaces_created: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of trait calls served
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Number of successful `create_namespace` calls
    pub fn namespaces_created(&self) -> usize {
        self.namespaces_created.load(Ordering::Relaxed)
    }

    /// Mark a namespace name as owned by a third party
    pub async fn add_foreign_namespace(&self, name: &str) {
        self.state.write().await.faults.foreign.insert(name.to_string());
    }

    /// Deny access to a namespace
    pub async fn deny_access(&self, name: &str) {
        self.state.write().await.faults.denied.insert(name.to_string());
    }

    pub async fn fail_get(&self, key: &str) {
        self.state
            .write()
            .await
            .faults
            .failing_gets
            .insert(key.to_string());
    }

    pub async fn fail_delete(&self, key: &str) {
        self.state
            .write()
            .await
            .faults
            .failing_deletes
            .insert(key.to_string());
    }

    /// Make `get` report the key as absent even though `list` still returns it
    pub async fn vanish_on_get(&self, key: &str) {
        self.state
            .write()
            .await
            .faults
            .vanishing
            .insert(key.to_string());
    }

    pub async fn set_fail_puts(&self, fail: bool) {
        self.state.write().await.faults.fail_puts = fail;
    }

    pub async fn set_fail_lists(&self, fail: bool) {
        self.state.write().await.faults.fail_lists = fail;
    }

    /// Number of objects stored in a namespace
    pub async fn object_count(&self, ns: &str) -> usize {
        self.state
            .read()
            .await
            .namespaces
            .get(ns)
            .map(|n| n.objects.len())
            .unwrap_or(0)
    }

    /// Placement a namespace was created with
    pub async fn placement_of(&self, ns: &str) -> Option<PlacementPolicy> {
        self.state
            .read()
            .await
            .namespaces
            .get(ns)
            .map(|n| n.placement.clone())
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}

fn check_access(state: &MemoryState, ns: &str) -> Result<(), StoreError> {
    if state.faults.foreign.contains(ns) || state.faults.denied.contains(ns) {
        return Err(StoreError::PermissionDenied(format!(
            "caller may not access namespace {ns}"
        )));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        self.record_request();
        let state = self.state.read().await;
        check_access(&state, name)?;
        Ok(state
            .namespaces
            .get(name)
            .map(|n| Namespace::new(name, n.placement.clone())))
    }

    async fn create_namespace(
        &self,
        name: &str,
        placement: &PlacementPolicy,
    ) -> Result<Namespace, StoreError> {
        self.record_request();
        let mut state = self.state.write().await;
        if state.faults.foreign.contains(name) || state.namespaces.contains_key(name) {
            return Err(StoreError::Conflict(format!(
                "namespace {name} already exists"
            )));
        }
        state.namespaces.insert(
            name.to_string(),
            StoredNamespace {
                placement: placement.clone(),
                objects: BTreeMap::new(),
            },
        );
        self.namespaces_created.fetch_add(1, Ordering::Relaxed);
        trace!(namespace = %name, placement = %placement, "Created in-memory namespace");
        Ok(Namespace::new(name, placement.clone()))
    }

    async fn put(&self, ns: &Namespace, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.record_request();
        let mut state = self.state.write().await;
        check_access(&state, &ns.name)?;
        if state.faults.fail_puts {
            return Err(StoreError::Backend(format!("injected put failure for {key}")));
        }
        let stored = state
            .namespaces
            .get_mut(&ns.name)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.name.clone()))?;
        stored.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.record_request();
        let state = self.state.read().await;
        check_access(&state, &ns.name)?;
        if state.faults.failing_gets.contains(key) {
            return Err(StoreError::Backend(format!("injected get failure for {key}")));
        }
        if state.faults.vanishing.contains(key) {
            return Ok(None);
        }
        let stored = state
            .namespaces
            .get(&ns.name)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.name.clone()))?;
        Ok(stored.objects.get(key).cloned())
    }

    async fn list(&self, ns: &Namespace, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.record_request();
        let state = self.state.read().await;
        check_access(&state, &ns.name)?;
        if state.faults.fail_lists {
            return Err(StoreError::Backend(format!(
                "injected list failure for {prefix}"
            )));
        }
        let stored = state
            .namespaces
            .get(&ns.name)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.name.clone()))?;
        Ok(stored
            .objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<bool, StoreError> {
        self.record_request();
        let mut state = self.state.write().await;
        check_access(&state, &ns.name)?;
        if state.faults.failing_deletes.contains(key) {
            return Err(StoreError::Backend(format!(
                "injected delete failure for {key}"
            )));
        }
        let stored = state
            .namespaces
            .get_mut(&ns.name)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.name.clone()))?;
        Ok(stored.objects.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_ns(name: &str) -> (MemoryStore, Namespace) {
        let store = MemoryStore::new();
        let ns = store
            .create_namespace(name, &PlacementPolicy::Regional)
            .await
            .unwrap();
        (store, ns)
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let (store, ns) = store_with_ns("ns").await;
        store.put(&ns, "c/a.list", b"one".to_vec()).await.unwrap();
        store.put(&ns, "c/a.list", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get(&ns, "c/a.list").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.object_count("ns").await, 1);
    }

    #[tokio::test]
    async fn test_list_is_prefix_scoped() {
        let (store, ns) = store_with_ns("ns").await;
        for key in ["grid/a.list", "grid/b.list", "grid2/c.list", "other/d.list"] {
            store.put(&ns, key, vec![1]).await.unwrap();
        }
        let keys = store.list(&ns, "grid/").await.unwrap();
        assert_eq!(keys, vec!["grid/a.list".to_string(), "grid/b.list".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let (store, ns) = store_with_ns("ns").await;
        store.put(&ns, "k", vec![1]).await.unwrap();
        assert!(store.delete(&ns, "k").await.unwrap());
        assert!(!store.delete(&ns, "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_foreign_namespace_conflicts_and_denies() {
        let store = MemoryStore::new();
        store.add_foreign_namespace("taken").await;
        assert!(store.get_namespace("taken").await.unwrap_err().is_permission_denied());
        assert!(matches!(
            store
                .create_namespace("taken", &PlacementPolicy::Regional)
                .await
                .unwrap_err(),
            StoreError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_namespace_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_namespace("nope").await.unwrap().is_none());
        assert_eq!(store.request_count(), 1);
    }
}
