//! Key-pair variants produced by the external bootstrapping tool.
//!
//! All cryptographic material enters the system through the tool bridge; the
//! orchestrator itself never generates or derives keys. Each variant mirrors
//! the JSON object the tool prints for the corresponding command, so the
//! bridge can deserialize straight into it.

use serde::{Deserialize, Serialize};

/// A block-signing account: secret plus public key.
///
/// Produced by the tool's `generatekey` command. The secret is embedded into
/// node 0's configuration file so that node can forge; all other nodes only
/// ever see the public key (see `SidechainBootstrapInfo::redacted`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Secret key, hex encoded.
    pub secret: String,
    /// Public key, hex encoded.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// A VRF key pair used for consensus slot eligibility checks.
///
/// Produced by the tool's `generateVrfKey` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfAccount {
    /// VRF secret key, hex encoded.
    #[serde(rename = "vrfSecret")]
    pub secret: String,
    /// VRF public key, hex encoded.
    #[serde(rename = "vrfPublicKey")]
    pub public_key: String,
}

/// A Schnorr key pair used for certificate signing.
///
/// Produced as part of the tool's `generateCertProofInfo` output (signer and
/// master keys) or standalone via `generateCertSignerKey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrAccount {
    /// Schnorr secret key, hex encoded.
    #[serde(rename = "schnorrSecret")]
    pub secret: String,
    /// Schnorr public key, hex encoded.
    #[serde(rename = "schnorrPublicKey")]
    pub public_key: String,
}
