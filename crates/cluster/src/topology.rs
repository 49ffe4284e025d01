//! Topology wiring between running nodes.
//!
//! Connections are established one pair at a time, and each connect call
//! is confirmed by watching both sides' peer counts increase by exactly
//! one before the next pair is attempted. A half-formed topology is an
//! error, never something to continue over.

use crate::client::PeerControl;
use crate::error::ClusterError;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Connection graph shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Node `i` dials node `i + 1`.
    Chain,
    /// A chain closed into a cycle: the last node also dials node 0.
    Ring,
    /// Every node dials node 0.
    Star,
    /// Same edges as a chain, but each joining node dials its predecessor.
    Daisy,
}

impl Topology {
    /// Directed connect calls `(dialer, dialed)` for `n` nodes.
    pub fn edges(&self, n: usize) -> Vec<(usize, usize)> {
        match self {
            Topology::Chain => (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect(),
            Topology::Daisy => (1..n).map(|i| (i, i - 1)).collect(),
            Topology::Ring => {
                let mut edges: Vec<(usize, usize)> =
                    (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
                // A two-node ring is just a chain; closing it would dial
                // the same pair twice.
                if n > 2 {
                    edges.push((n - 1, 0));
                }
                edges
            }
            Topology::Star => (1..n).map(|i| (i, 0)).collect(),
        }
    }
}

/// One node as seen by the wiring code: its control API and the p2p port
/// peers dial.
pub struct PeerNode<'a> {
    pub control: &'a dyn PeerControl,
    pub p2p_port: u16,
}

/// Connect the dialer to the dialed node and confirm on both sides.
///
/// Confirmation requires each side's peer count to increase by exactly
/// one relative to the counts sampled before the connect call; anything
/// else within `confirm_timeout` is a [`ClusterError::Topology`].
pub async fn connect_pair(
    from_index: usize,
    from: &PeerNode<'_>,
    to_index: usize,
    to: &PeerNode<'_>,
    confirm_timeout: Duration,
) -> Result<(), ClusterError> {
    let before_from = from.control.connected_peers().await?;
    let before_to = to.control.connected_peers().await?;

    from.control.connect_peer("127.0.0.1", to.p2p_port).await?;

    let deadline = Instant::now() + confirm_timeout;
    loop {
        let now_from = from.control.connected_peers().await?;
        let now_to = to.control.connected_peers().await?;
        if now_from == before_from + 1 && now_to == before_to + 1 {
            debug!(from_index, to_index, "peer connection confirmed");
            return Ok(());
        }
        if now_from > before_from + 1 || now_to > before_to + 1 {
            return Err(ClusterError::Topology {
                from: from_index,
                to: to_index,
                detail: format!(
                    "peer counts advanced by more than one ({before_from}->{now_from}, {before_to}->{now_to})"
                ),
            });
        }
        if Instant::now() >= deadline {
            return Err(ClusterError::Topology {
                from: from_index,
                to: to_index,
                detail: format!(
                    "peer counts did not advance within {confirm_timeout:?} ({before_from}->{now_from}, {before_to}->{now_to})"
                ),
            });
        }
        sleep(CONFIRM_POLL_INTERVAL).await;
    }
}

/// Wire every node of one sidechain into the given topology.
pub async fn wire_topology(
    nodes: &[PeerNode<'_>],
    topology: Topology,
    confirm_timeout: Duration,
) -> Result<(), ClusterError> {
    for (from, to) in topology.edges(nodes.len()) {
        connect_pair(from, &nodes[from], to, &nodes[to], confirm_timeout).await?;
    }
    Ok(())
}
