//! Discovery Configuration
//!
//! Defaults for every discovery setting with environment variable overrides.
//! Unparseable values keep the default; `validate()` rejects settings the
//! node cannot start with.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Object store backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store, lost on exit
    Memory,
    /// Local directory via OpenDAL
    Fs,
    /// Google Cloud Storage via OpenDAL
    Gcs,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "fs" => Ok(Self::Fs),
            "gcs" => Ok(Self::Gcs),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("namespace must be set (DISCOVERY_NAMESPACE)")]
    MissingNamespace,

    #[error("cluster name must be set (CLUSTER_NAME)")]
    MissingClusterName,

    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    #[error("GCS backend requires GCS_BUCKET")]
    MissingGcsBucket,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Discovery node configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    // Cluster identity
    /// Cluster this node joins (env: CLUSTER_NAME)
    pub cluster_name: String,

    /// Logical name advertised to peers (env: NODE_NAME)
    pub node_name: Option<String>,

    /// Transport address advertised to peers (env: PHYSICAL_ADDR)
    pub physical_addr: Option<String>,

    // Namespace
    /// Namespace shared by all clusters of the deployment (env: DISCOVERY_NAMESPACE)
    pub namespace: String,

    /// Region code for a multi-regional namespace (env: DISCOVERY_REGION)
    pub region: Option<String>,

    /// Create the namespace when absent (env: DISCOVERY_CREATE_NAMESPACE)
    pub create_namespace: bool,

    // Storage backend
    /// env: DISCOVERY_BACKEND
    pub backend: StoreBackend,

    /// Root directory for the fs backend (env: DISCOVERY_FS_ROOT)
    pub fs_root: String,

    /// Bucket holding all namespaces for the gcs backend (env: GCS_BUCKET)
    pub gcs_bucket: Option<String>,

    /// Service account file for the gcs backend (env: GCS_CREDENTIAL_PATH)
    pub gcs_credential_path: Option<String>,

    // Timers
    /// Republish interval (env: HEARTBEAT_INTERVAL_SECS)
    pub heartbeat_interval: Duration,

    /// Steady-state discovery interval (env: DISCOVERY_INTERVAL_SECS)
    pub discovery_interval: Duration,

    /// Initial discovery rounds before entering maintenance (env: DISCOVERY_ROUNDS)
    pub discovery_rounds: u32,

    /// Pause between initial discovery rounds (env: DISCOVERY_ROUND_INTERVAL_MS)
    pub round_interval: Duration,

    /// Stop initial discovery only once a coordinator has answered (env: BREAK_ON_COORDINATOR)
    pub break_on_coordinator: bool,

    /// Coordinator rewrites the cluster's objects on view change (env: PURGE_ON_VIEW_CHANGE)
    pub purge_on_view_change: bool,

    // Observability
    /// Prometheus listener (env: METRICS_ADDR)
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cluster_name: "default".to_string(),
            node_name: None,
            physical_addr: None,

            namespace: String::new(),
            region: None,
            create_namespace: true,

            backend: StoreBackend::Memory,
            fs_root: "/var/lib/bucketping".to_string(),
            gcs_bucket: None,
            gcs_credential_path: None,

            heartbeat_interval: Duration::from_secs(60),
            discovery_interval: Duration::from_secs(30),
            discovery_rounds: 3,
            round_interval: Duration::from_secs(1),
            break_on_coordinator: true,
            purge_on_view_change: false,

            metrics_addr: Some(SocketAddr::from(([0, 0, 0, 0], 9464))),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl DiscoveryConfig {
    /// Create configuration from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(cluster) = lookup("CLUSTER_NAME") {
            config.cluster_name = cluster.trim().to_string();
        }
        config.node_name = lookup("NODE_NAME").and_then(non_empty);
        config.physical_addr = lookup("PHYSICAL_ADDR").and_then(non_empty);

        if let Some(namespace) = lookup("DISCOVERY_NAMESPACE") {
            config.namespace = namespace.trim().to_string();
        }
        config.region = lookup("DISCOVERY_REGION").and_then(non_empty);
        if let Some(create) = lookup("DISCOVERY_CREATE_NAMESPACE").and_then(|v| parse_bool(&v)) {
            config.create_namespace = create;
        }

        if let Some(backend) = lookup("DISCOVERY_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(root) = lookup("DISCOVERY_FS_ROOT").and_then(non_empty) {
            config.fs_root = root;
        }
        config.gcs_bucket = lookup("GCS_BUCKET").and_then(non_empty);
        config.gcs_credential_path = lookup("GCS_CREDENTIAL_PATH").and_then(non_empty);

        if let Some(secs) = lookup("HEARTBEAT_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("DISCOVERY_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.discovery_interval = Duration::from_secs(secs);
        }
        if let Some(rounds) = lookup("DISCOVERY_ROUNDS").and_then(|v| v.parse::<u32>().ok()) {
            config.discovery_rounds = rounds;
        }
        if let Some(ms) = lookup("DISCOVERY_ROUND_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.round_interval = Duration::from_millis(ms);
        }
        if let Some(brk) = lookup("BREAK_ON_COORDINATOR").and_then(|v| parse_bool(&v)) {
            config.break_on_coordinator = brk;
        }
        if let Some(purge) = lookup("PURGE_ON_VIEW_CHANGE").and_then(|v| parse_bool(&v)) {
            config.purge_on_view_change = purge;
        }

        if let Some(addr) = lookup("METRICS_ADDR") {
            // An empty value disables the listener
            config.metrics_addr = non_empty(addr).and_then(|a| a.parse().ok());
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingNamespace);
        }
        if self.cluster_name.is_empty() {
            return Err(ConfigError::MissingClusterName);
        }
        if self.backend == StoreBackend::Gcs && self.gcs_bucket.is_none() {
            return Err(ConfigError::MissingGcsBucket);
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("heartbeat interval"));
        }
        if self.discovery_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("discovery interval"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<DiscoveryConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DiscoveryConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.cluster_name, "default");
        assert!(config.create_namespace);
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.discovery_rounds, 3);
        assert_eq!(
            config.metrics_addr,
            Some("0.0.0.0:9464".parse().unwrap())
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("CLUSTER_NAME", "grid"),
            ("DISCOVERY_NAMESPACE", "demo-ns"),
            ("DISCOVERY_REGION", "eu"),
            ("DISCOVERY_CREATE_NAMESPACE", "false"),
            ("DISCOVERY_BACKEND", "fs"),
            ("DISCOVERY_FS_ROOT", "/tmp/ping"),
            ("HEARTBEAT_INTERVAL_SECS", "5"),
            ("DISCOVERY_INTERVAL_SECS", "7"),
            ("DISCOVERY_ROUNDS", "2"),
            ("DISCOVERY_ROUND_INTERVAL_MS", "250"),
            ("BREAK_ON_COORDINATOR", "off"),
            ("NODE_NAME", "n1"),
            ("PHYSICAL_ADDR", "10.0.0.1:7800"),
            ("PURGE_ON_VIEW_CHANGE", "yes"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
        ])
        .unwrap();

        assert_eq!(config.cluster_name, "grid");
        assert_eq!(config.namespace, "demo-ns");
        assert_eq!(config.region.as_deref(), Some("eu"));
        assert!(!config.create_namespace);
        assert_eq!(config.backend, StoreBackend::Fs);
        assert_eq!(config.fs_root, "/tmp/ping");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.discovery_interval, Duration::from_secs(7));
        assert_eq!(config.discovery_rounds, 2);
        assert_eq!(config.round_interval, Duration::from_millis(250));
        assert!(!config.break_on_coordinator);
        assert_eq!(config.node_name.as_deref(), Some("n1"));
        assert_eq!(config.physical_addr.as_deref(), Some("10.0.0.1:7800"));
        assert!(config.purge_on_view_change);
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = config_from(&[
            ("HEARTBEAT_INTERVAL_SECS", "soon"),
            ("DISCOVERY_CREATE_NAMESPACE", "maybe"),
            ("DISCOVERY_REGION", "  "),
        ])
        .unwrap();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(60));
        assert!(config.create_namespace);
        assert!(config.region.is_none());
    }

    #[test]
    fn test_empty_metrics_addr_disables_listener() {
        let config = config_from(&[("METRICS_ADDR", "")]).unwrap();
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = config_from(&[("DISCOVERY_BACKEND", "s3")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownBackend("s3".to_string()));
    }

    #[test]
    fn test_validate() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingNamespace));

        let config = config_from(&[("DISCOVERY_NAMESPACE", "ns"), ("CLUSTER_NAME", "")]).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingClusterName));

        let config =
            config_from(&[("DISCOVERY_NAMESPACE", "ns"), ("DISCOVERY_BACKEND", "gcs")]).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingGcsBucket));

        let config = config_from(&[
            ("DISCOVERY_NAMESPACE", "ns"),
            ("HEARTBEAT_INTERVAL_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("heartbeat interval"))
        );
    }
}
