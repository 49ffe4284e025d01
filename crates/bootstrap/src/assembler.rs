//! The genesis assembler: the fixed-order sidechain creation sequence.
//!
//! Creation is a cross-system dance between the bootstrap tool and the
//! mainchain, and the order is part of the protocol. Key material must
//! exist before the creation transaction can reference it, the creation
//! transaction must be mined before genesis info exists, and the genesis
//! payload must be parsed by the tool before any node configuration can
//! be rendered. Every step failure is fatal to the sidechain: nothing
//! partial survives that a retry could resume from.

use crate::error::{BootstrapError, BridgeError};
use crate::keygen::{generate_secrets, generate_vrf_secrets};
use crate::mainchain::{MainchainClient, SidechainCreationRequest};
use crate::proof::{generate_certificate_proof_info, generate_csw_proof_info};
use crate::tool::BootstrapTool;
use serde::{Deserialize, Serialize};
use sidenet_types::{
    CswProofInfo, ProofKeysPaths, SidechainBootstrapInfo, SidechainCreationInfo,
    DEFAULT_BLOCK_TIMESTAMP_REWIND,
};
use tracing::{debug, info};

/// Default seed prefix for deterministic key derivation.
pub const DEFAULT_KEY_SEED: &str = "seed";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenesisInfoParams<'a> {
    secret: &'a str,
    vrf_secret: &'a str,
    info: &'a str,
    regtest_block_timestamp_rewind: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenesisData {
    sc_genesis_block_hex: String,
    pow_data: String,
    mc_block_height: u64,
    mc_network: String,
    withdrawal_epoch_length: u32,
    initial_cumulative_comm_tree_hash: String,
}

/// Drives the sidechain creation sequence end to end.
///
/// Borrows the tool bridge and a mainchain client; owns nothing but the
/// key-derivation seed. One assembler can create any number of sidechains,
/// provided each call uses distinct SNARK key paths.
pub struct GenesisAssembler<'a> {
    tool: &'a BootstrapTool,
    mainchain: &'a dyn MainchainClient,
    seed: String,
}

impl<'a> GenesisAssembler<'a> {
    pub fn new(tool: &'a BootstrapTool, mainchain: &'a dyn MainchainClient) -> Self {
        Self { tool, mainchain, seed: DEFAULT_KEY_SEED.to_owned() }
    }

    /// Override the key-derivation seed. Distinct sidechains in one network
    /// must use distinct seeds or they end up with identical keys.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Create one sidechain and assemble its bootstrap descriptor.
    ///
    /// Runs the full sequence: key generation, proof construction, the
    /// mainchain creation transaction, mining the confirmation block, and
    /// genesis payload parsing. `timestamp_rewind` shifts the genesis block
    /// timestamp into the past so forged blocks are immediately acceptable
    /// in regtest; [`DEFAULT_BLOCK_TIMESTAMP_REWIND`] suits most tests.
    pub async fn create_sidechain(
        &self,
        creation: &SidechainCreationInfo,
        timestamp_rewind: Option<u64>,
        cert_keys_paths: ProofKeysPaths,
        csw_keys_paths: ProofKeysPaths,
    ) -> Result<SidechainBootstrapInfo, BootstrapError> {
        let accounts = generate_secrets(self.tool, &self.seed, 1)
            .await
            .map_err(|e| BootstrapError::at("generate genesis account", e))?;
        let genesis_account = accounts.into_iter().next().ok_or_else(|| {
            BootstrapError::at(
                "generate genesis account",
                BridgeError::MalformedOutput {
                    command: "generatekey".to_owned(),
                    params: self.seed.clone(),
                    output: "empty key batch".to_owned(),
                },
            )
        })?;

        let vrf_accounts = generate_vrf_secrets(self.tool, &self.seed, 1)
            .await
            .map_err(|e| BootstrapError::at("generate vrf key", e))?;
        let genesis_vrf_account = vrf_accounts.into_iter().next().ok_or_else(|| {
            BootstrapError::at(
                "generate vrf key",
                BridgeError::MalformedOutput {
                    command: "generateVrfKey".to_owned(),
                    params: self.seed.clone(),
                    output: "empty key batch".to_owned(),
                },
            )
        })?;
        debug!(public_key = %genesis_account.public_key, "genesis keys generated");

        let certificate_proof_info = generate_certificate_proof_info(
            self.tool,
            &self.seed,
            creation.cert_max_keys,
            creation.cert_sig_threshold,
            creation.circuit_type,
            &cert_keys_paths,
        )
        .await
        .map_err(|e| BootstrapError::at("build certificate proof info", e))?;

        let csw_proof_info = if creation.csw_enabled {
            generate_csw_proof_info(self.tool, creation.withdrawal_epoch_length, &csw_keys_paths)
                .await
                .map_err(|e| BootstrapError::at("build csw proof info", e))?
        } else {
            CswProofInfo::Disabled
        };

        let request = SidechainCreationRequest {
            version: creation.creation_version.as_u8(),
            withdrawal_epoch_length: if creation.is_non_ceasing {
                0
            } else {
                creation.withdrawal_epoch_length
            },
            to_address: genesis_account.public_key.clone(),
            amount: creation.forward_amount,
            vrf_public_key: genesis_vrf_account.public_key.clone(),
            cert_verification_key: certificate_proof_info.verification_key.clone(),
            constant: certificate_proof_info.gen_sys_constant.clone(),
            csw_verification_key: csw_proof_info.verification_key().map(str::to_owned),
            btr_data_length: creation.btr_data_length,
        };
        let created = self
            .mainchain
            .create_sidechain(&request)
            .await
            .map_err(|e| BootstrapError::at("submit creation transaction", e))?;
        info!(sidechain_id = %created.scid, txid = %created.txid, "sidechain created");

        // The creation transaction is only effective once mined.
        self.mainchain
            .generate_blocks(1)
            .await
            .map_err(|e| BootstrapError::at("mine creation block", e))?;

        let info = self
            .mainchain
            .sidechain_genesis_info(&created.scid)
            .await
            .map_err(|e| BootstrapError::at("fetch genesis info", e))?;

        let params = GenesisInfoParams {
            secret: &genesis_account.secret,
            vrf_secret: &genesis_vrf_account.secret,
            info: &info,
            regtest_block_timestamp_rewind: timestamp_rewind
                .unwrap_or(DEFAULT_BLOCK_TIMESTAMP_REWIND),
        };
        let genesis: GenesisData = self
            .tool
            .invoke("genesisinfo", &params)
            .await
            .map_err(|e| BootstrapError::at("parse genesis info", e))?;

        Ok(SidechainBootstrapInfo {
            sidechain_id: created.scid,
            genesis_account: Some(genesis_account),
            genesis_account_balance: creation.forward_amount,
            mainchain_block_height: genesis.mc_block_height,
            genesis_block_hex: genesis.sc_genesis_block_hex,
            pow_data: genesis.pow_data,
            network: genesis.mc_network,
            withdrawal_epoch_length: genesis.withdrawal_epoch_length,
            genesis_vrf_account,
            certificate_proof_info,
            initial_cumulative_comm_tree_hash: genesis.initial_cumulative_comm_tree_hash,
            cert_keys_paths,
            csw_keys_paths,
            csw_proof_info,
        })
    }
}
