//! Node lifecycle, topology wiring and convergence polling for sidenet
//! test networks.
//!
//! Where [`sidenet_bootstrap`] produces the material a sidechain starts
//! from, this crate turns that material into a running network: it
//! allocates conflict-free ports, renders per-node configuration files,
//! spawns and supervises node processes, wires them into a topology, and
//! provides the polling primitives tests use to wait for the network to
//! converge.

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod render;
pub mod sync;
pub mod topology;

pub use client::{ApiError, ChainView, NodeClient, PeerControl};
pub use error::ClusterError;
pub use lifecycle::{LaunchPool, LaunchSpec, NodeManager, NodeStatus};
pub use options::{init_tracing, DebugTarget, RunnerOptions};
pub use orchestrator::{Orchestrator, SidechainHandle};
pub use ports::{NodePorts, PortAllocator};
pub use registry::{ProcessRegistry, SidechainRegistry};
pub use render::{render, substitutions_for_node, write_node_config, RenderError, SubstitutionMap};
pub use sync::{sync_blocks, sync_mempools, wait_for_node_initialization, SyncError};
pub use topology::{connect_pair, wire_topology, PeerNode, Topology};
