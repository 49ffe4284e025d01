//! Convergence engine tests against in-memory chain views.

use async_trait::async_trait;
use parking_lot::Mutex;
use sidenet_cluster::{
    sync::{sync_blocks_with_interval, sync_mempools_with_interval},
    ApiError, ChainView, SyncError,
};
use std::time::{Duration, Instant};

/// Chain view whose state advances by a fixed amount per poll.
struct SteppingNode {
    height: Mutex<u64>,
    target: u64,
    txs: Mutex<Vec<String>>,
}

impl SteppingNode {
    fn new(start: u64, target: u64) -> Self {
        Self { height: Mutex::new(start), target, txs: Mutex::new(Vec::new()) }
    }

    fn with_txs(txs: &[&str]) -> Self {
        Self {
            height: Mutex::new(0),
            target: 0,
            txs: Mutex::new(txs.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl ChainView for SteppingNode {
    async fn best_block_height(&self) -> Result<u64, ApiError> {
        let mut height = self.height.lock();
        let current = *height;
        if current < self.target {
            *height += 1;
        }
        Ok(current)
    }

    async fn mempool_tx_ids(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.txs.lock().clone())
    }

    async fn mempool_size(&self) -> Result<usize, ApiError> {
        Ok(self.txs.lock().len())
    }
}

const FAST_POLL: Duration = Duration::from_millis(10);

#[tokio::test]
async fn sync_blocks_returns_once_heights_agree() {
    let lagging = SteppingNode::new(0, 3);
    let leading = SteppingNode::new(3, 3);
    let nodes: Vec<&dyn ChainView> = vec![&lagging, &leading];

    sync_blocks_with_interval(&nodes, Duration::from_secs(2), FAST_POLL).await.unwrap();
    assert_eq!(lagging.best_block_height().await.unwrap(), 3);
}

#[tokio::test]
async fn sync_blocks_with_a_stuck_node_times_out_promptly() {
    let stuck = SteppingNode::new(0, 0);
    let leading = SteppingNode::new(3, 3);
    let nodes: Vec<&dyn ChainView> = vec![&stuck, &leading];

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let err = sync_blocks_with_interval(&nodes, timeout, FAST_POLL).await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        SyncError::Timeout { operation, .. } => assert_eq!(operation, "Syncing blocks"),
        other => panic!("expected timeout, got {other:?}"),
    }
    // Bounded by the timeout plus one poll interval, with scheduling slack.
    assert!(elapsed < timeout + FAST_POLL + Duration::from_millis(100), "took {elapsed:?}");
}

#[tokio::test]
async fn sync_mempools_compares_full_tx_id_sets() {
    let a = SteppingNode::with_txs(&["t1", "t2"]);
    let b = SteppingNode::with_txs(&["t2", "t3"]);
    let nodes: Vec<&dyn ChainView> = vec![&a, &b];

    // Same cardinality but different contents: strict comparison fails,
    // cardinality-only succeeds.
    let err = sync_mempools_with_interval(&nodes, Duration::from_millis(100), false, FAST_POLL)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout { operation: "Syncing mempools", .. }));

    sync_mempools_with_interval(&nodes, Duration::from_millis(100), true, FAST_POLL)
        .await
        .unwrap();
}

#[tokio::test]
async fn sync_mempools_ignores_tx_order() {
    let a = SteppingNode::with_txs(&["t1", "t2"]);
    let b = SteppingNode::with_txs(&["t2", "t1"]);
    let nodes: Vec<&dyn ChainView> = vec![&a, &b];

    sync_mempools_with_interval(&nodes, Duration::from_millis(100), false, FAST_POLL)
        .await
        .unwrap();
}
