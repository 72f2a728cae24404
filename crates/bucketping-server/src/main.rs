//! Bucketping Server - Object-store cluster discovery daemon

use anyhow::{anyhow, Context};
use bucketping_core::{MemberAddress, MemberDescriptor, ProtocolRegistry};
use bucketping_server::config::{DiscoveryConfig, StoreBackend};
use bucketping_server::discovery::{
    run_discovery_controller, ControllerSettings, DiscoveryCommand, DiscoveryEvent,
    StorageDiscovery,
};
use bucketping_server::observability::{init_metrics, init_tracing, shutdown_tracing, TracingConfig};
use bucketping_server::store::{MemoryStore, ObjectStore, OpendalStore};
use bucketping_server::version;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

fn build_store(config: &DiscoveryConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Fs => Arc::new(
            OpendalStore::new_fs(&config.fs_root)
                .with_context(|| format!("failed to open fs store at {}", config.fs_root))?,
        ),
        StoreBackend::Gcs => {
            let bucket = config
                .gcs_bucket
                .as_deref()
                .ok_or_else(|| anyhow!("GCS_BUCKET is required for the gcs backend"))?;
            Arc::new(
                OpendalStore::new_gcs(bucket, "/", config.gcs_credential_path.as_deref())
                    .with_context(|| format!("failed to open gcs bucket {bucket}"))?,
            )
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::from_env())
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    info!(version = %version::full_version(), agent = version::USER_AGENT, "Starting Bucketping Server...");
    debug!(build = ?version::BuildInfo::current(), "Build info");

    let config = DiscoveryConfig::from_env().context("invalid discovery configuration")?;
    config.validate().context("invalid discovery configuration")?;

    let mut registry = ProtocolRegistry::new();
    registry
        .register_bucket_ping()
        .context("failed to register discovery protocol")?;

    let metrics = init_metrics(config.metrics_addr)
        .map_err(|e| anyhow!("failed to initialize metrics: {e}"))?;
    if let Some(addr) = config.metrics_addr {
        info!(addr = %addr, "Metrics endpoint listening");
    }

    let local_address = MemberAddress::random();
    let mut local = MemberDescriptor::new(local_address);
    if let Some(name) = &config.node_name {
        local = local.with_logical_name(name.clone());
    }
    if let Some(addr) = &config.physical_addr {
        local = local.with_physical_address(addr.clone());
    }

    info!(
        cluster = %config.cluster_name,
        namespace = %config.namespace,
        member = %local.display_name(),
        backend = ?config.backend,
        "Node identity"
    );

    let store = build_store(&config)?;
    let discovery = Arc::new(StorageDiscovery::new(store).with_local_address(local_address));

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let settings = ControllerSettings::from_config(&config);
    let controller = tokio::spawn(run_discovery_controller(
        discovery.clone(),
        local,
        settings,
        events_tx,
        command_rx,
    ));

    // Without a membership layer the node only logs what it sees
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                DiscoveryEvent::PeerJoined(peer) => {
                    info!(peer = %peer.display_name(), physical_address = ?peer.physical_address, "Peer joined");
                }
                DiscoveryEvent::PeerDeparted(address) => {
                    info!(peer = %address, "Peer departed");
                }
                DiscoveryEvent::Converged { peers } => {
                    info!(peer_count = peers, "Initial discovery converged");
                }
                DiscoveryEvent::RoundCompleted(responses) => {
                    debug!(responses = responses.len(), "Discovery round completed");
                }
            }
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
            let _ = command_tx.send(DiscoveryCommand::Shutdown);
        }
        _ = command_tx.closed() => {}
    }

    let outcome = match controller.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "Discovery controller failed");
            Err(anyhow::Error::new(e).context("discovery controller failed"))
        }
        Err(e) => Err(anyhow::Error::new(e).context("discovery controller panicked")),
    };

    event_logger.abort();
    debug!(
        snapshot = %metrics.prometheus_handle.render(),
        "Final metrics snapshot"
    );
    info!(
        cached_peers = discovery.peer_cache().len().await,
        "Bucketping Server stopped"
    );
    shutdown_tracing();
    outcome
}
