//! Multi-sidechain orchestration.
//!
//! The orchestrator runs the bootstrap sequence once per sidechain, renders
//! and writes node configurations, launches the node processes, and wires
//! them into a topology. Preparation (bootstrap + rendering) and launch are
//! separate phases so tests can exercise everything up to the spawn without
//! real node binaries.
//!
//! Node port slots are global across sidechains of one orchestrator, so two
//! sidechains in one run never collide. Failures leave already-started
//! processes running; cleanup goes through [`Orchestrator::teardown`], there
//! is no automatic rollback.

use crate::client::NodeClient;
use crate::error::ClusterError;
use crate::lifecycle::{LaunchPool, LaunchSpec, NodeManager};
use crate::ports::{NodePorts, PortAllocator};
use crate::registry::SidechainRegistry;
use crate::render::{render, substitutions_for_node, write_node_config};
use crate::topology::{wire_topology, PeerNode, Topology};
use parking_lot::Mutex;
use sidenet_bootstrap::{BootstrapTool, GenesisAssembler, MainchainClient};
use sidenet_types::{
    LogLevel, NodeConfiguration, ProofKeysPaths, SidechainBootstrapInfo,
    SidechainConfiguration, SidechainOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A prepared sidechain: bootstrap done, configs on disk, nothing launched
/// yet (or launched, if [`Orchestrator::launch_sidechain`] already ran).
#[derive(Debug)]
pub struct SidechainHandle {
    /// Stable sidechain index within this orchestrator.
    pub index: usize,
    /// Sidechain directory holding the per-node directories.
    pub directory: PathBuf,
    /// Full bootstrap descriptor (node 0 view).
    pub info: SidechainBootstrapInfo,
    /// Effective per-node configurations, options already applied.
    pub nodes: Vec<NodeConfiguration>,
    /// Rendered configuration file per node.
    pub config_paths: Vec<PathBuf>,
    /// Allocated ports per node.
    pub ports: Vec<NodePorts>,
    /// First global port slot of this sidechain.
    pub first_slot: usize,
}

impl SidechainHandle {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Global port slot of the node at `node_index`.
    pub fn slot(&self, node_index: usize) -> usize {
        self.first_slot + node_index
    }

    /// RPC ports of every node, in node order.
    pub fn rpc_ports(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.rpc).collect()
    }
}

/// Drives bootstrap, launch and wiring for one-to-many sidechains.
pub struct Orchestrator<'a> {
    tool: &'a BootstrapTool,
    mainchain: &'a dyn MainchainClient,
    allocator: PortAllocator,
    registry: SidechainRegistry,
    manager: Arc<NodeManager>,
    root_dir: PathBuf,
    next_slot: Mutex<usize>,
    log_file_level: LogLevel,
    log_console_level: LogLevel,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        tool: &'a BootstrapTool,
        mainchain: &'a dyn MainchainClient,
        allocator: PortAllocator,
        registry: SidechainRegistry,
        manager: Arc<NodeManager>,
        root_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool,
            mainchain,
            allocator,
            registry,
            manager,
            root_dir: root_dir.into(),
            next_slot: Mutex::new(0),
            log_file_level: LogLevel::All,
            log_console_level: LogLevel::Error,
        }
    }

    /// Override the log levels rendered into node configurations.
    pub fn with_log_levels(mut self, file: LogLevel, console: LogLevel) -> Self {
        self.log_file_level = file;
        self.log_console_level = console;
        self
    }

    /// The process lifecycle manager behind this orchestrator.
    pub fn manager(&self) -> &Arc<NodeManager> {
        &self.manager
    }

    /// Port allocator of this run's identity namespace.
    pub fn allocator(&self) -> PortAllocator {
        self.allocator
    }

    fn claim_slots(&self, count: usize) -> usize {
        let mut next = self.next_slot.lock();
        let first = *next;
        *next += count;
        first
    }

    /// Bootstrap one sidechain and write its node configurations.
    ///
    /// Applies `options` to the creation parameters and validates the result
    /// before anything else happens; an invalid combination is rejected here,
    /// never after a subprocess was spawned. Node 0 gets the full bootstrap
    /// descriptor, every other node the redacted one.
    pub async fn prepare_sidechain(
        &self,
        config: &SidechainConfiguration,
        options: &SidechainOptions,
        template: &str,
        timestamp_rewind: Option<u64>,
    ) -> Result<SidechainHandle, ClusterError> {
        // The raw configuration is checked before options are applied, so a
        // hand-built invalid creation is rejected rather than papered over
        // by the option upgrade rules.
        config.validate()?;
        let effective = SidechainConfiguration {
            creation: config.creation.clone().with_options(options),
            nodes: config.nodes.clone(),
        };
        effective.validate()?;

        let index = self.registry.next_index();
        let directory = self.root_dir.join(format!("sidechain{index}"));
        let keys_dir = directory.join("snark_keys");
        fs::create_dir_all(&keys_dir)
            .map_err(|e| ClusterError::io(format!("creating {}", keys_dir.display()), e))?;

        let assembler =
            GenesisAssembler::new(self.tool, self.mainchain).with_seed(format!("seed{index}"));
        let info = assembler
            .create_sidechain(
                &effective.creation,
                timestamp_rewind,
                ProofKeysPaths::for_certificate(&keys_dir),
                ProofKeysPaths::for_csw(&keys_dir, effective.creation.withdrawal_epoch_length),
            )
            .await?;
        info!(sidechain = index, id = %info.sidechain_id, "sidechain bootstrapped");

        let first_slot = self.claim_slots(effective.nodes.len());
        let mut config_paths = Vec::with_capacity(effective.nodes.len());
        let mut ports = Vec::with_capacity(effective.nodes.len());
        for (node_index, node_config) in effective.nodes.iter().enumerate() {
            let node_ports = self.allocator.node_ports(first_slot + node_index);
            let node_dir = directory.join(format!("node{node_index}"));
            let node_info = if node_index == 0 { info.clone() } else { info.redacted() };
            let substitutions = substitutions_for_node(
                &node_info,
                node_config,
                node_ports,
                node_index,
                &node_dir,
                self.log_file_level,
                self.log_console_level,
            );
            let rendered = render(template, &substitutions)?;
            let path = write_node_config(&directory, node_index, &rendered)
                .map_err(|e| ClusterError::io(format!("writing config for node {node_index}"), e))?;
            config_paths.push(path);
            ports.push(node_ports);
        }

        Ok(SidechainHandle {
            index,
            directory,
            info,
            nodes: effective.nodes,
            config_paths,
            ports,
            first_slot,
        })
    }

    /// Launch every node of a prepared sidechain and wire the topology.
    ///
    /// Launches run concurrently, each bounded by `launch_bound`; with
    /// `pin_cpus` every node is pinned to its own core modulo the machine's
    /// parallelism.
    pub async fn launch_sidechain(
        &self,
        handle: &SidechainHandle,
        binary: &Path,
        topology: Topology,
        launch_bound: Duration,
        confirm_timeout: Duration,
        pin_cpus: bool,
    ) -> Result<(), ClusterError> {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let mut pool = LaunchPool::new(Arc::clone(&self.manager));
        for node_index in 0..handle.node_count() {
            let mut spec = LaunchSpec::new(binary, &handle.config_paths[node_index]);
            spec.log_file =
                Some(handle.directory.join(format!("node{node_index}")).join("node.log"));
            if pin_cpus {
                spec.cpu_pin = Some(handle.slot(node_index) % cores);
            }
            pool.launch(handle.slot(node_index), spec, handle.ports[node_index].rpc, launch_bound);
        }
        pool.join().await?;

        let clients = self.clients(handle)?;
        let peer_nodes: Vec<PeerNode<'_>> = clients
            .iter()
            .zip(&handle.ports)
            .map(|(client, ports)| PeerNode { control: client, p2p_port: ports.p2p })
            .collect();
        wire_topology(&peer_nodes, topology, confirm_timeout).await?;
        info!(sidechain = handle.index, ?topology, "sidechain network is wired");
        Ok(())
    }

    /// Prepare and launch in one call.
    #[allow(clippy::too_many_arguments)]
    pub async fn bootstrap_sidechain(
        &self,
        config: &SidechainConfiguration,
        options: &SidechainOptions,
        template: &str,
        timestamp_rewind: Option<u64>,
        binary: &Path,
        topology: Topology,
        launch_bound: Duration,
        confirm_timeout: Duration,
    ) -> Result<SidechainHandle, ClusterError> {
        let handle = self.prepare_sidechain(config, options, template, timestamp_rewind).await?;
        self.launch_sidechain(&handle, binary, topology, launch_bound, confirm_timeout, false)
            .await?;
        Ok(handle)
    }

    /// Control-API client for one node of a prepared sidechain.
    pub fn node_client(
        &self,
        handle: &SidechainHandle,
        node_index: usize,
    ) -> Result<NodeClient, ClusterError> {
        let config = &handle.nodes[node_index];
        Ok(NodeClient::new(
            handle.ports[node_index].rpc,
            &config.api_key,
            Duration::from_secs(config.rest_api_timeout_secs),
        )?)
    }

    fn clients(&self, handle: &SidechainHandle) -> Result<Vec<NodeClient>, ClusterError> {
        (0..handle.node_count()).map(|i| self.node_client(handle, i)).collect()
    }

    /// Stop every node of one sidechain through its control API, killing
    /// the ones that do not comply within `grace`.
    pub async fn stop_sidechain(
        &self,
        handle: &SidechainHandle,
        grace: Duration,
    ) -> Result<(), ClusterError> {
        for node_index in 0..handle.node_count() {
            let client = self.node_client(handle, node_index)?;
            self.manager.stop(handle.slot(node_index), Some(&client), grace).await?;
        }
        Ok(())
    }

    /// Kill every node this orchestrator ever launched.
    pub async fn teardown(&self) {
        self.manager.kill_all().await;
    }
}
