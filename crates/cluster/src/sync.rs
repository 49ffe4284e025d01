//! Convergence polling primitives.
//!
//! Tests drive the network into a state and then block until every node
//! agrees on it. These are plain polling loops with a fixed interval.
//! Queries inside one iteration are sequential, never parallel: the
//! effective poll period grows with the node count, which is the timing
//! behavior failure-injection tests depend on.

use crate::client::{ApiError, ChainView};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Interval between poll iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Convergence failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The nodes did not converge before the deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation name, e.g. `Syncing blocks`.
        operation: &'static str,
        /// The elapsed bound.
        timeout: Duration,
    },

    /// A node query failed mid-poll.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Block until every node reports the same best-block height.
pub async fn sync_blocks(nodes: &[&dyn ChainView], timeout: Duration) -> Result<(), SyncError> {
    sync_blocks_with_interval(nodes, timeout, DEFAULT_POLL_INTERVAL).await
}

/// [`sync_blocks`] with an explicit poll interval.
pub async fn sync_blocks_with_interval(
    nodes: &[&dyn ChainView],
    timeout: Duration,
    interval: Duration,
) -> Result<(), SyncError> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut heights = Vec::with_capacity(nodes.len());
        for node in nodes {
            heights.push(node.best_block_height().await?);
        }
        trace!(?heights, "block sync poll");
        if heights.windows(2).all(|w| w[0] == w[1]) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SyncError::Timeout { operation: "Syncing blocks", timeout });
        }
        sleep(interval).await;
    }
}

/// Block until every node reports the same mempool.
///
/// With `cardinality_only` set, only transaction counts are compared;
/// otherwise the full transaction-id sets must match.
pub async fn sync_mempools(
    nodes: &[&dyn ChainView],
    timeout: Duration,
    cardinality_only: bool,
) -> Result<(), SyncError> {
    sync_mempools_with_interval(nodes, timeout, cardinality_only, DEFAULT_POLL_INTERVAL).await
}

/// [`sync_mempools`] with an explicit poll interval.
pub async fn sync_mempools_with_interval(
    nodes: &[&dyn ChainView],
    timeout: Duration,
    cardinality_only: bool,
    interval: Duration,
) -> Result<(), SyncError> {
    let deadline = Instant::now() + timeout;
    loop {
        let converged = if cardinality_only {
            let mut sizes = Vec::with_capacity(nodes.len());
            for node in nodes {
                sizes.push(node.mempool_size().await?);
            }
            trace!(?sizes, "mempool sync poll");
            sizes.windows(2).all(|w| w[0] == w[1])
        } else {
            let mut pools: Vec<BTreeSet<String>> = Vec::with_capacity(nodes.len());
            for node in nodes {
                pools.push(node.mempool_tx_ids().await?.into_iter().collect());
            }
            pools.windows(2).all(|w| w[0] == w[1])
        };
        if converged {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SyncError::Timeout { operation: "Syncing mempools", timeout });
        }
        sleep(interval).await;
    }
}

/// Block until every given RPC port accepts a TCP connection.
///
/// Used after a launch wave to confirm each node's API server is up
/// before any control call is issued.
pub async fn wait_for_node_initialization(
    rpc_ports: &[u16],
    timeout: Duration,
) -> Result<(), SyncError> {
    let deadline = Instant::now() + timeout;
    for &port in rpc_ports {
        loop {
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(SyncError::Timeout {
                    operation: "Waiting for node initialization",
                    timeout,
                });
            }
            sleep(DEFAULT_POLL_INTERVAL).await;
        }
    }
    Ok(())
}
