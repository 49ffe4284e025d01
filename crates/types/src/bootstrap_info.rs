//! The immutable per-sidechain bootstrap descriptor.

use crate::account::{GenesisAccount, VrfAccount};
use crate::proof::{CertificateProofInfo, CswProofInfo, ProofKeysPaths};
use serde::{Deserialize, Serialize};

/// Everything a sidechain node needs to start from genesis.
///
/// Assembled once per sidechain by the genesis assembler and shared by
/// reference with every node of that sidechain. Two variants exist: the full
/// descriptor carrying the genesis account secret goes to node 0 only; every
/// other node receives [`SidechainBootstrapInfo::redacted`], which drops the
/// secret. This is a deliberate least-privilege split: only one node can
/// forge from the genesis stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainBootstrapInfo {
    /// Sidechain identifier assigned by the mainchain creation transaction.
    pub sidechain_id: String,
    /// Genesis forging account; `None` in the redacted variant.
    pub genesis_account: Option<GenesisAccount>,
    /// Amount forwarded to the genesis account at creation, in coins.
    pub genesis_account_balance: u64,
    /// Mainchain block height at which the sidechain was created.
    pub mainchain_block_height: u64,
    /// Serialized sidechain genesis block, hex encoded.
    pub genesis_block_hex: String,
    /// Proof-of-work data for the genesis mainchain reference.
    pub pow_data: String,
    /// Mainchain network name (regtest, testnet, mainnet).
    pub network: String,
    /// Withdrawal epoch length in mainchain blocks.
    pub withdrawal_epoch_length: u32,
    /// VRF account backing the genesis forging stake.
    pub genesis_vrf_account: VrfAccount,
    /// Certificate proof descriptor shared by all nodes of the sidechain.
    pub certificate_proof_info: CertificateProofInfo,
    /// Cumulative commitment tree hash at the creation block.
    pub initial_cumulative_comm_tree_hash: String,
    /// Certificate SNARK key file locations.
    pub cert_keys_paths: ProofKeysPaths,
    /// CSW SNARK key file locations.
    pub csw_keys_paths: ProofKeysPaths,
    /// CSW proof material, or the explicit disabled placeholder.
    pub csw_proof_info: CswProofInfo,
}

impl SidechainBootstrapInfo {
    /// The variant handed to every node except node 0.
    ///
    /// Identical to the full descriptor with the genesis account secret
    /// removed.
    pub fn redacted(&self) -> Self {
        Self {
            genesis_account: None,
            ..self.clone()
        }
    }
}
