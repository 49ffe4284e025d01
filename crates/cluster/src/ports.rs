//! Conflict-free port derivation for concurrently running test networks.
//!
//! Several test runs share one machine, so ports are derived from a
//! per-run identity instead of being hardcoded. The derivation is pure
//! arithmetic: collisions across unrelated processes are mitigated, not
//! excluded, and a caller that loses the race simply retries the bind
//! under a fresh identity.

/// First REST API port.
pub const RPC_PORT_BASE: u16 = 8200;
/// First peer-to-peer port.
pub const P2P_PORT_BASE: u16 = 8300;
/// First node websocket server port.
pub const WS_PORT_BASE: u16 = 8400;

/// Identity offset applied per parallel runner group.
pub const PARALLEL_GROUP_STRIDE: u32 = 100;

/// Ports of one node, derived together so they always agree on identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePorts {
    /// REST control API port.
    pub rpc: u16,
    /// Peer-to-peer bind port.
    pub p2p: u16,
    /// Websocket server port.
    pub websocket: u16,
}

/// Derives node ports from a run identity.
///
/// The identity folds the parallel-group offset in at construction, so a
/// group shift moves every derived port at once; it is never applied to
/// individual ports after the fact.
#[derive(Debug, Clone, Copy)]
pub struct PortAllocator {
    effective_id: u32,
}

impl PortAllocator {
    pub fn new(process_id: u32, parallel_group: u16) -> Self {
        Self { effective_id: process_id + u32::from(parallel_group) * PARALLEL_GROUP_STRIDE }
    }

    /// Identity of the current OS process, shifted by `parallel_group`.
    pub fn from_current_process(parallel_group: u16) -> Self {
        Self::new(std::process::id(), parallel_group)
    }

    fn port(&self, base: u16, index: usize) -> u16 {
        base + index as u16 + (self.effective_id % 999) as u16
    }

    /// REST control API port for node `index`.
    pub fn rpc_port(&self, index: usize) -> u16 {
        self.port(RPC_PORT_BASE, index)
    }

    /// Peer-to-peer port for node `index`.
    pub fn p2p_port(&self, index: usize) -> u16 {
        self.port(P2P_PORT_BASE, index)
    }

    /// Websocket server port for node `index`.
    pub fn websocket_port(&self, index: usize) -> u16 {
        self.port(WS_PORT_BASE, index)
    }

    /// All three ports of node `index`.
    pub fn node_ports(&self, index: usize) -> NodePorts {
        NodePorts {
            rpc: self.rpc_port(index),
            p2p: self.p2p_port(index),
            websocket: self.websocket_port(index),
        }
    }
}
