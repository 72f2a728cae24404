//! OpenDAL-backed object store
//!
//! Each namespace is a top-level directory under the operator root, with a
//! small manifest object recording the placement it was created with. On GCS
//! the operator is bound to one pre-provisioned bucket and namespaces become
//! prefixes inside it.

use super::{Namespace, ObjectStore, PlacementPolicy, StoreError};
use async_trait::async_trait;
use opendal::services::{Fs, Gcs, Memory};
use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const MANIFEST: &str = ".namespace";

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceManifest {
    placement: PlacementPolicy,
}

fn map_err(context: &str, e: opendal::Error) -> StoreError {
    match e.kind() {
        ErrorKind::PermissionDenied => StoreError::PermissionDenied(format!("{context}: {e}")),
        ErrorKind::AlreadyExists => StoreError::Conflict(format!("{context}: {e}")),
        _ => StoreError::Backend(format!("{context}: {e}")),
    }
}

/// Backend-agnostic object store powered by Apache OpenDAL
pub struct OpendalStore {
    op: Operator,
    backend: &'static str,
}

impl OpendalStore {
    /// Store rooted at a local directory
    pub fn new_fs(root_path: &str) -> Result<Self, StoreError> {
        let mut builder = Fs::default();
        builder.root(root_path);
        let op = Operator::new(builder)
            .map_err(|e| map_err("fs operator", e))?
            .finish();
        Ok(Self { op, backend: "fs" })
    }

    /// Store held in OpenDAL's in-memory service
    pub fn new_memory() -> Result<Self, StoreError> {
        let op = Operator::new(Memory::default())
            .map_err(|e| map_err("memory operator", e))?
            .finish();
        Ok(Self {
            op,
            backend: "opendal-memory",
        })
    }

    /// Store inside an existing Google Cloud Storage bucket
    pub fn new_gcs(
        bucket: &str,
        root: &str,
        credential_path: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut builder = Gcs::default();
        builder.bucket(bucket);
        builder.root(root);
        if let Some(path) = credential_path {
            builder.credential_path(path);
        }
        let op = Operator::new(builder)
            .map_err(|e| map_err("gcs operator", e))?
            .finish();
        Ok(Self { op, backend: "gcs" })
    }

    fn object_path(ns: &Namespace, key: &str) -> String {
        format!("{}/{}", ns.name, key)
    }

    fn manifest_path(name: &str) -> String {
        format!("{name}/{MANIFEST}")
    }
}

#[async_trait]
impl ObjectStore for OpendalStore {
    fn backend_name(&self) -> &'static str {
        self.backend
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        match self.op.read(&Self::manifest_path(name)).await {
            Ok(data) => {
                let manifest: NamespaceManifest = serde_json::from_slice(&data.to_vec())
                    .map_err(|e| StoreError::Backend(format!("namespace manifest {name}: {e}")))?;
                Ok(Some(Namespace::new(name, manifest.placement)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_err(name, e)),
        }
    }

    async fn create_namespace(
        &self,
        name: &str,
        placement: &PlacementPolicy,
    ) -> Result<Namespace, StoreError> {
        if self.get_namespace(name).await?.is_some() {
            return Err(StoreError::Conflict(format!(
                "namespace {name} already exists"
            )));
        }

        self.op
            .create_dir(&format!("{name}/"))
            .await
            .map_err(|e| map_err(name, e))?;

        let manifest = serde_json::to_vec(&NamespaceManifest {
            placement: placement.clone(),
        })
        .map_err(|e| StoreError::Backend(format!("namespace manifest {name}: {e}")))?;
        self.op
            .write(&Self::manifest_path(name), manifest)
            .await
            .map_err(|e| map_err(name, e))?;

        debug!(namespace = %name, placement = %placement, backend = self.backend, "Namespace created");
        Ok(Namespace::new(name, placement.clone()))
    }

    async fn put(&self, ns: &Namespace, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = Self::object_path(ns, key);
        self.op
            .write(&path, bytes)
            .await
            .map_err(|e| map_err(&path, e))
    }

    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = Self::object_path(ns, key);
        match self.op.read(&path).await {
            Ok(data) => Ok(Some(data.to_vec())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_err(&path, e)),
        }
    }

    async fn list(&self, ns: &Namespace, prefix: &str) -> Result<Vec<String>, StoreError> {
        let root = format!("{}/", ns.name);
        let full_prefix = format!("{root}{prefix}");
        // OpenDAL lists directories, so list the parent of the prefix and filter
        let dir = match full_prefix.rfind('/') {
            Some(idx) => full_prefix[..=idx].to_string(),
            None => root.clone(),
        };

        let entries = match self.op.list(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_err(&dir, e)),
        };

        let mut keys: Vec<String> = entries
            .iter()
            .map(|entry| entry.path())
            .filter(|path| !path.ends_with('/') && path.starts_with(&full_prefix))
            .filter_map(|path| path.strip_prefix(&root).map(str::to_string))
            .collect();
        keys.sort();

        trace!(namespace = %ns.name, prefix = %prefix, count = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<bool, StoreError> {
        let path = Self::object_path(ns, key);
        match self.op.stat(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(map_err(&path, e)),
        }
        self.op
            .delete(&path)
            .await
            .map_err(|e| map_err(&path, e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fs_store() -> (TempDir, OpendalStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().to_str().expect("temp path is utf-8").to_string();
        let store = OpendalStore::new_fs(&root).expect("Failed to build fs store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_fs_namespace_lifecycle() {
        let (_dir, store) = fs_store();
        assert!(store.get_namespace("demo-ns").await.unwrap().is_none());

        let placement = PlacementPolicy::from_region(Some("eu"));
        let ns = store.create_namespace("demo-ns", &placement).await.unwrap();
        assert_eq!(ns.placement, placement);

        let fetched = store.get_namespace("demo-ns").await.unwrap().unwrap();
        assert_eq!(fetched, ns);

        let err = store
            .create_namespace("demo-ns", &PlacementPolicy::Regional)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    async fn check_objects(store: &OpendalStore) {
        let ns = store
            .create_namespace("ns", &PlacementPolicy::Regional)
            .await
            .unwrap();

        store.put(&ns, "grid/a.list", b"a".to_vec()).await.unwrap();
        store.put(&ns, "grid/b.list", b"b".to_vec()).await.unwrap();
        store.put(&ns, "grid2/c.list", b"c".to_vec()).await.unwrap();

        let keys = store.list(&ns, "grid/").await.unwrap();
        assert_eq!(keys, vec!["grid/a.list".to_string(), "grid/b.list".to_string()]);

        assert_eq!(store.get(&ns, "grid/a.list").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.get(&ns, "grid/zz.list").await.unwrap(), None);

        assert!(store.delete(&ns, "grid/a.list").await.unwrap());
        assert!(!store.delete(&ns, "grid/a.list").await.unwrap());
        assert_eq!(store.list(&ns, "grid/").await.unwrap(), vec!["grid/b.list".to_string()]);
    }

    #[tokio::test]
    async fn test_fs_objects() {
        let (_dir, store) = fs_store();
        check_objects(&store).await;
    }

    #[tokio::test]
    async fn test_memory_objects() {
        let store = OpendalStore::new_memory().unwrap();
        assert_eq!(store.backend_name(), "opendal-memory");
        check_objects(&store).await;
    }

    #[tokio::test]
    async fn test_memory_namespace_keeps_placement() {
        let store = OpendalStore::new_memory().unwrap();
        let placement = PlacementPolicy::from_region(Some("us"));
        store.create_namespace("ns", &placement).await.unwrap();
        let ns = store.get_namespace("ns").await.unwrap().unwrap();
        assert_eq!(ns.placement, placement);
    }

    #[tokio::test]
    async fn test_fs_list_missing_prefix_is_empty() {
        let (_dir, store) = fs_store();
        let ns = store
            .create_namespace("ns", &PlacementPolicy::Regional)
            .await
            .unwrap();
        assert!(store.list(&ns, "nobody/").await.unwrap().is_empty());
    }
}
