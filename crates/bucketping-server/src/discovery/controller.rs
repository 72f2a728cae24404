//! Discovery Controller
//!
//! Drives the storage discovery protocol on timers:
//! Initialization -> Registration -> Convergence -> Maintenance -> Terminating
//!
//! Only namespace resolution can stop the controller with an error. Every
//! other failure is logged and retried by the next tick.

use super::responses::ResponseSet;
use super::DiscoveryProtocol;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryResult;
use crate::observability::events;
use crate::store::PlacementPolicy;
use bucketping_core::{MemberAddress, MemberDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Discovery controller state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Resolving the namespace
    Initialization,
    /// Publishing the local descriptor
    Registration,
    /// Running initial discovery rounds
    Convergence,
    /// Steady-state: heartbeat republish and periodic discovery
    Maintenance,
    /// Graceful shutdown in progress
    Terminating,
}

/// Commands sent to the discovery controller by the membership layer
#[derive(Debug)]
pub enum DiscoveryCommand {
    /// Update the local coordinator hint and republish
    SetCoordinator(bool),
    /// Republish the local descriptor now
    PublishNow,
    /// Membership view changed; the coordinator may rewrite the cluster's objects
    ViewChanged { members: Vec<MemberDescriptor> },
    /// Retract the local descriptor and stop
    Shutdown,
}

/// Notifications emitted to the membership layer
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A peer appeared in a discovery round
    PeerJoined(MemberDescriptor),
    /// A previously seen peer is no longer published
    PeerDeparted(MemberAddress),
    /// Initial convergence finished
    Converged { peers: usize },
    /// Full result of the latest round
    RoundCompleted(ResponseSet),
}

/// Timer and protocol settings used by the controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub namespace: String,
    pub placement: PlacementPolicy,
    pub auto_create_namespace: bool,
    pub cluster: String,
    pub heartbeat_interval: Duration,
    pub discovery_interval: Duration,
    pub discovery_rounds: u32,
    pub round_interval: Duration,
    pub break_on_coordinator: bool,
    pub purge_on_view_change: bool,
}

impl ControllerSettings {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            placement: PlacementPolicy::from_region(config.region.as_deref()),
            auto_create_namespace: config.create_namespace,
            cluster: config.cluster_name.clone(),
            heartbeat_interval: config.heartbeat_interval,
            discovery_interval: config.discovery_interval,
            discovery_rounds: config.discovery_rounds,
            round_interval: config.round_interval,
            break_on_coordinator: config.break_on_coordinator,
            purge_on_view_change: config.purge_on_view_change,
        }
    }
}

/// Discovery Controller
///
/// Owns the local descriptor and the last known peer set; everything else
/// lives in the object store.
pub struct DiscoveryController {
    protocol: Arc<dyn DiscoveryProtocol>,
    local: MemberDescriptor,
    settings: ControllerSettings,
    state: DiscoveryState,
    /// Peers seen in the last successful round, excluding self
    known_peers: HashMap<MemberAddress, MemberDescriptor>,
    /// Membership view written by the coordinator; empty when the local
    /// object holds only the local descriptor
    view: Vec<MemberDescriptor>,
    events_tx: mpsc::UnboundedSender<DiscoveryEvent>,
    /// Channel for receiving commands (None after extracted in run())
    command_rx: Option<mpsc::UnboundedReceiver<DiscoveryCommand>>,
}

impl DiscoveryController {
    pub fn new(
        protocol: Arc<dyn DiscoveryProtocol>,
        local: MemberDescriptor,
        settings: ControllerSettings,
        events_tx: mpsc::UnboundedSender<DiscoveryEvent>,
        command_rx: mpsc::UnboundedReceiver<DiscoveryCommand>,
    ) -> Self {
        debug!(
            cluster = %settings.cluster,
            namespace = %settings.namespace,
            member = %local.address.short(),
            "Creating discovery controller"
        );

        Self {
            protocol,
            local,
            settings,
            state: DiscoveryState::Initialization,
            known_peers: HashMap::new(),
            view: Vec::new(),
            events_tx,
            command_rx: Some(command_rx),
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    fn owns_view(&self) -> bool {
        self.settings.purge_on_view_change && self.local.is_coordinator && !self.view.is_empty()
    }

    fn emit(&self, event: DiscoveryEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("Discovery event receiver dropped");
        }
    }

    /// Phase 1: resolve the namespace. Failure is fatal.
    async fn initialize(&mut self) -> DiscoveryResult<()> {
        info!("Discovery: Phase 1 - Initialization");
        self.state = DiscoveryState::Initialization;

        self.protocol
            .ensure_namespace(
                &self.settings.namespace,
                &self.settings.placement,
                self.settings.auto_create_namespace,
            )
            .await
            .map_err(|e| {
                error!(namespace = %self.settings.namespace, error = %e, "Namespace unavailable");
                e
            })?;
        Ok(())
    }

    /// Phase 2: publish the local descriptor.
    async fn register(&mut self) {
        info!("Discovery: Phase 2 - Registration");
        self.state = DiscoveryState::Registration;
        self.publish_current().await;
    }

    /// Phase 3: run discovery rounds until a peer shows up or rounds run out.
    ///
    /// Commands are served between rounds. Returns `false` if a shutdown
    /// arrived or the command channel closed.
    async fn converge(&mut self, command_rx: &mut mpsc::UnboundedReceiver<DiscoveryCommand>) -> bool {
        info!("Discovery: Phase 3 - Convergence");
        self.state = DiscoveryState::Convergence;

        let rounds = self.settings.discovery_rounds.max(1);
        for round in 1..=rounds {
            if let Some(responses) = self.run_round().await {
                let local = self.local.address;
                let mut peers = responses.peers_excluding(&local).peekable();
                let found_peer = peers.peek().is_some();
                let found_coordinator = peers.any(|r| r.is_coordinator);

                if self.settings.break_on_coordinator && found_coordinator {
                    debug!(round = round, "Coordinator response received");
                    break;
                }
                if found_peer && !self.settings.break_on_coordinator {
                    break;
                }
            }

            if round < rounds {
                debug!(round = round, "No peers yet, retrying discovery");
                if !self.pause(command_rx).await {
                    return false;
                }
            }
        }

        let peers = self.known_peers.len();
        info!(peer_count = peers, "Convergence complete");
        self.emit(DiscoveryEvent::Converged { peers });
        true
    }

    /// Wait `round_interval` while still serving commands.
    async fn pause(&mut self, command_rx: &mut mpsc::UnboundedReceiver<DiscoveryCommand>) -> bool {
        let sleep = tokio::time::sleep(self.settings.round_interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = command_rx.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            info!("Discovery: received shutdown command during convergence");
                            return false;
                        }
                    }
                    None => {
                        info!("Discovery: command channel closed during convergence");
                        return false;
                    }
                },
            }
        }
    }

    /// Write the local object: the owned view while coordinating, otherwise
    /// just the local descriptor. Failures are left to the next heartbeat.
    async fn publish_current(&self) -> bool {
        if self.owns_view() {
            self.publish_list(&self.view).await
        } else {
            self.publish_list(std::slice::from_ref(&self.local)).await
        }
    }

    async fn publish_list(&self, descriptors: &[MemberDescriptor]) -> bool {
        match self
            .protocol
            .publish(&self.settings.cluster, &self.local.address, descriptors)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(cluster = %self.settings.cluster, error = %e, "Failed publishing descriptor");
                false
            }
        }
    }

    /// One discovery round; updates the known peer set and emits join/depart events.
    async fn run_round(&mut self) -> Option<ResponseSet> {
        let report = match self
            .protocol
            .discover(Some(&self.settings.cluster), None)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(cluster = %self.settings.cluster, error = %e, "Discovery round failed");
                return None;
            }
        };

        for failure in &report.failures {
            debug!(key = %failure.key, error = %failure.error, "Skipped descriptor object");
        }

        let local = self.local.address;
        let mut current: HashMap<MemberAddress, MemberDescriptor> = HashMap::new();
        for response in report.responses.peers_excluding(&local) {
            current.insert(response.descriptor.address, response.descriptor.clone());
        }

        for (address, descriptor) in &current {
            if !self.known_peers.contains_key(address) {
                events::peer_joined(
                    &address.to_string(),
                    &descriptor.display_name(),
                    &self.settings.cluster,
                );
                self.emit(DiscoveryEvent::PeerJoined(descriptor.clone()));
            }
        }
        for address in self.known_peers.keys() {
            if !current.contains_key(address) {
                events::peer_departed(&address.to_string(), &self.settings.cluster);
                self.emit(DiscoveryEvent::PeerDeparted(*address));
            }
        }

        self.known_peers = current;
        self.emit(DiscoveryEvent::RoundCompleted(report.responses.clone()));
        Some(report.responses)
    }

    /// Returns `false` once the controller should stop.
    async fn handle_command(&mut self, command: DiscoveryCommand) -> bool {
        match command {
            DiscoveryCommand::SetCoordinator(is_coordinator) => {
                if self.local.is_coordinator != is_coordinator {
                    info!(is_coordinator = is_coordinator, "Coordinator hint changed");
                }
                self.local.is_coordinator = is_coordinator;
                if is_coordinator {
                    let local = self.local.clone();
                    if let Some(entry) = self.view.iter_mut().find(|m| m.address == local.address) {
                        *entry = local;
                    }
                } else {
                    self.view.clear();
                }
                self.publish_current().await;
                true
            }
            DiscoveryCommand::PublishNow => {
                self.publish_current().await;
                true
            }
            DiscoveryCommand::ViewChanged { members } => {
                self.handle_view_change(members).await;
                true
            }
            DiscoveryCommand::Shutdown => false,
        }
    }

    /// The coordinator optionally purges stale objects and republishes the whole view
    async fn handle_view_change(&mut self, members: Vec<MemberDescriptor>) {
        if !(self.settings.purge_on_view_change && self.local.is_coordinator) {
            self.publish_current().await;
            return;
        }

        match self.protocol.purge_cluster(&self.settings.cluster).await {
            Ok(report) if !report.is_complete() => {
                warn!(
                    deleted = report.deleted,
                    failed = report.failures.len(),
                    "Cluster purge left objects behind"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(cluster = %self.settings.cluster, error = %e, "Cluster purge failed");
            }
        }

        let mut view = vec![self.local.clone()];
        view.extend(
            members
                .into_iter()
                .filter(|m| m.address != self.local.address),
        );
        debug!(view_size = view.len(), "Publishing membership view");
        self.view = view;
        self.publish_current().await;
    }

    /// Graceful shutdown: retract the local descriptor.
    async fn shutdown(&mut self) {
        info!("Discovery: initiating graceful shutdown");
        self.state = DiscoveryState::Terminating;

        match self
            .protocol
            .retract(&self.settings.cluster, &self.local.address)
            .await
        {
            Ok(true) => debug!("Local descriptor retracted"),
            Ok(false) => debug!("Local descriptor was already gone"),
            Err(e) => warn!(error = %e, "Failed to retract local descriptor"),
        }

        info!("Discovery: shutdown complete");
    }

    /// Run the complete discovery protocol state machine.
    pub async fn run(mut self) -> DiscoveryResult<()> {
        let mut command_rx = match self.command_rx.take() {
            Some(rx) => rx,
            None => return Ok(()),
        };

        self.initialize().await?;
        self.register().await;
        if !self.converge(&mut command_rx).await {
            self.shutdown().await;
            return Ok(());
        }

        info!("Discovery: Phase 4 - Maintenance");
        self.state = DiscoveryState::Maintenance;

        let mut heartbeat = tokio::time::interval(self.settings.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await; // Skip first immediate tick

        let mut discovery = tokio::time::interval(self.settings.discovery_interval);
        discovery.set_missed_tick_behavior(MissedTickBehavior::Delay);
        discovery.tick().await;

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                info!("Discovery: received shutdown command");
                                break;
                            }
                        }
                        None => {
                            info!("Discovery: command channel closed");
                            break;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    self.publish_current().await;
                }

                _ = discovery.tick() => {
                    self.run_round().await;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }
}

/// Wrapper to build and run the controller
pub async fn run_discovery_controller(
    protocol: Arc<dyn DiscoveryProtocol>,
    local: MemberDescriptor,
    settings: ControllerSettings,
    events_tx: mpsc::UnboundedSender<DiscoveryEvent>,
    command_rx: mpsc::UnboundedReceiver<DiscoveryCommand>,
) -> DiscoveryResult<()> {
    let controller = DiscoveryController::new(protocol, local, settings, events_tx, command_rx);
    controller.run().await
}
