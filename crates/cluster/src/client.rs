//! REST control-API client for a running sidechain node.
//!
//! Only the handful of endpoints the orchestrator and the convergence
//! engine need are covered; the node's full REST surface stays out of
//! scope. The two traits are the seams tests mock: [`ChainView`] for
//! convergence polling, [`PeerControl`] for topology wiring and shutdown.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Control-API failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a well-formed HTTP answer.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path that was called.
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with an application-level error payload.
    #[error("node rejected {endpoint}: {detail}")]
    Rejected {
        /// Endpoint path that was called.
        endpoint: String,
        /// Error payload as reported by the node.
        detail: String,
    },

    /// The node answered 200 but the payload was not what was asked for.
    #[error("unexpected response from {endpoint}: {detail}")]
    UnexpectedResponse {
        /// Endpoint path that was called.
        endpoint: String,
        /// What was wrong with the payload.
        detail: String,
    },
}

/// Read-only view of a node's chain and mempool state.
#[async_trait]
pub trait ChainView: Send + Sync {
    /// Height of the node's current best block.
    async fn best_block_height(&self) -> Result<u64, ApiError>;

    /// Transaction ids currently in the node's mempool.
    async fn mempool_tx_ids(&self) -> Result<Vec<String>, ApiError>;

    /// Number of transactions in the node's mempool.
    async fn mempool_size(&self) -> Result<usize, ApiError>;
}

/// Peer management and shutdown surface of a node.
#[async_trait]
pub trait PeerControl: Send + Sync {
    /// Ask the node to dial a peer.
    async fn connect_peer(&self, host: &str, port: u16) -> Result<(), ApiError>;

    /// Number of currently connected peers.
    async fn connected_peers(&self) -> Result<usize, ApiError>;

    /// Ask the node to drop a peer connection.
    async fn disconnect_peer(&self, host: &str, port: u16) -> Result<(), ApiError>;

    /// Ask the node to shut itself down.
    async fn stop(&self) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct BestBlock {
    height: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MempoolTxs {
    transaction_ids: Vec<String>,
}

#[derive(Deserialize)]
struct Peers {
    peers: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct PeerAddress<'a> {
    host: &'a str,
    port: u16,
}

/// Control-API client for one node.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NodeClient {
    /// Client for the node listening on `127.0.0.1:{rpc_port}`.
    pub fn new(rpc_port: u16, api_key: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport { endpoint: "<builder>".into(), source })?;
        Ok(Self {
            http,
            base_url: format!("http://127.0.0.1:{rpc_port}"),
            api_key: api_key.to_owned(),
        })
    }

    /// REST base URL of the node.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(endpoint, base = %self.base_url, "control api call");
        let response = self
            .http
            .post(format!("{}{endpoint}", self.base_url))
            .header("api_key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint: endpoint.to_owned(), source })?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|source| ApiError::Transport { endpoint: endpoint.to_owned(), source })?;

        if let Some(error) = envelope.error {
            return Err(ApiError::Rejected {
                endpoint: endpoint.to_owned(),
                detail: error.to_string(),
            });
        }
        envelope.result.ok_or_else(|| ApiError::UnexpectedResponse {
            endpoint: endpoint.to_owned(),
            detail: "neither result nor error in response".to_owned(),
        })
    }
}

#[async_trait]
impl ChainView for NodeClient {
    async fn best_block_height(&self) -> Result<u64, ApiError> {
        let best: BestBlock = self.post("/block/best", &serde_json::json!({})).await?;
        Ok(best.height)
    }

    async fn mempool_tx_ids(&self) -> Result<Vec<String>, ApiError> {
        let mempool: MempoolTxs = self
            .post("/transaction/allTransactionIds", &serde_json::json!({}))
            .await?;
        Ok(mempool.transaction_ids)
    }

    async fn mempool_size(&self) -> Result<usize, ApiError> {
        Ok(self.mempool_tx_ids().await?.len())
    }
}

#[async_trait]
impl PeerControl for NodeClient {
    async fn connect_peer(&self, host: &str, port: u16) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/node/connect", &PeerAddress { host, port })
            .await?;
        Ok(())
    }

    async fn connected_peers(&self) -> Result<usize, ApiError> {
        let peers: Peers = self
            .post("/node/connectedPeers", &serde_json::json!({}))
            .await?;
        Ok(peers.peers.len())
    }

    async fn disconnect_peer(&self, host: &str, port: u16) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/node/disconnect", &PeerAddress { host, port })
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post("/node/stop", &serde_json::json!({})).await?;
        Ok(())
    }
}
