//! Mainchain node access for sidechain creation.
//!
//! The mainchain speaks bitcoin-style JSON-RPC. Only the handful of calls
//! the bootstrap sequence needs are surfaced here; everything else the
//! mainchain can do is out of scope. The [`MainchainClient`] trait is the
//! seam that lets bootstrap logic run against an in-memory fake in tests.

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mainchain RPC failures.
#[derive(Debug, Error)]
pub enum MainchainError {
    /// Transport or RPC-level failure from the client.
    #[error("mainchain rpc failed: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    /// The node answered, but not with what the bootstrap needs.
    #[error("unexpected mainchain response to `{call}`: {detail}")]
    UnexpectedResponse {
        /// RPC method that was called.
        call: &'static str,
        /// What was wrong with the answer.
        detail: String,
    },
}

/// Parameters of the `sc_create` mainchain call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidechainCreationRequest {
    /// Creation transaction version (1 or 2).
    pub version: u8,
    /// Withdrawal epoch length; 0 declares a non-ceasing sidechain.
    pub withdrawal_epoch_length: u32,
    /// Genesis account public key receiving the forward transfer.
    pub to_address: String,
    /// Forward transfer amount, in coins.
    pub amount: u64,
    /// VRF public key registered for the genesis forging stake.
    pub vrf_public_key: String,
    /// Certificate verification key.
    pub cert_verification_key: String,
    /// Circuit system constant.
    pub constant: String,
    /// CSW verification key; absent for non-ceasing sidechains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csw_verification_key: Option<String>,
    /// Backward-transfer request data length, in field elements.
    pub btr_data_length: u32,
}

/// Answer to a successful `sc_create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScCreateResponse {
    /// Creation transaction id.
    pub txid: String,
    /// Identifier assigned to the new sidechain.
    pub scid: String,
}

/// The mainchain calls the bootstrap sequence depends on.
#[async_trait]
pub trait MainchainClient: Send + Sync {
    /// Submit a sidechain creation transaction.
    async fn create_sidechain(
        &self,
        request: &SidechainCreationRequest,
    ) -> Result<ScCreateResponse, MainchainError>;

    /// Mine `count` blocks; returns their hashes.
    async fn generate_blocks(&self, count: u32) -> Result<Vec<String>, MainchainError>;

    /// Fetch the serialized genesis info payload for a created sidechain.
    async fn sidechain_genesis_info(&self, sidechain_id: &str) -> Result<String, MainchainError>;

    /// Current best block height.
    async fn block_count(&self) -> Result<u64, MainchainError>;
}

/// JSON-RPC implementation of [`MainchainClient`].
pub struct MainchainRpcClient {
    client: HttpClient,
}

impl MainchainRpcClient {
    /// Connect to a mainchain node's RPC endpoint, e.g.
    /// `http://127.0.0.1:8332`.
    pub fn new(url: &str) -> Result<Self, MainchainError> {
        let client = HttpClientBuilder::default().build(url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MainchainClient for MainchainRpcClient {
    async fn create_sidechain(
        &self,
        request: &SidechainCreationRequest,
    ) -> Result<ScCreateResponse, MainchainError> {
        Ok(self.client.request("sc_create", rpc_params![request]).await?)
    }

    async fn generate_blocks(&self, count: u32) -> Result<Vec<String>, MainchainError> {
        Ok(self.client.request("generate", rpc_params![count]).await?)
    }

    async fn sidechain_genesis_info(&self, sidechain_id: &str) -> Result<String, MainchainError> {
        Ok(self
            .client
            .request("getscgenesisinfo", rpc_params![sidechain_id])
            .await?)
    }

    async fn block_count(&self) -> Result<u64, MainchainError> {
        Ok(self.client.request("getblockcount", rpc_params![]).await?)
    }
}
