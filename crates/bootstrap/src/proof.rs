//! Certificate and CSW proof construction through the tool bridge.

use crate::error::BridgeError;
use crate::tool::BootstrapTool;
use serde::{Deserialize, Serialize};
use sidenet_types::{
    CertificateCircuitType, CertificateProofInfo, CswProofInfo, ProofError, ProofKeysPaths,
    SchnorrAccount,
};
use thiserror::Error;

/// Proof builder failures: either the bridge itself, or a structurally
/// inconsistent descriptor coming back from the tool.
#[derive(Debug, Error)]
pub enum ProofBuildError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Descriptor(#[from] ProofError),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertProofParams<'a> {
    seed: &'a str,
    max_pks: usize,
    threshold: usize,
    key_rotation: bool,
    proving_key_path: &'a std::path::Path,
    verification_key_path: &'a std::path::Path,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertProofResponse {
    threshold: usize,
    verification_key: String,
    gen_sys_constant: String,
    schnorr_keys: Vec<SchnorrAccount>,
    #[serde(default)]
    master_keys: Vec<SchnorrAccount>,
}

/// Build the certificate proof descriptor for one sidechain.
///
/// Asks the tool (`generateCertProofInfo`) for `signer_count` Schnorr key
/// pairs, the verification key, and the circuit system constant, then merges
/// the locally held secrets into a [`CertificateProofInfo`]. The key-rotation
/// circuit additionally yields one master key pair per signer.
///
/// `threshold <= signer_count` is the caller's responsibility; it is
/// validated once at the orchestrator boundary and not re-checked here.
/// Structural consistency of the tool's answer (aligned arrays, requested
/// signer count) is checked, since a malformed descriptor would otherwise
/// surface only as a confusing node startup failure.
pub async fn generate_certificate_proof_info(
    tool: &BootstrapTool,
    seed: &str,
    signer_count: usize,
    threshold: usize,
    circuit: CertificateCircuitType,
    keys_paths: &ProofKeysPaths,
) -> Result<CertificateProofInfo, ProofBuildError> {
    let params = CertProofParams {
        seed,
        max_pks: signer_count,
        threshold,
        key_rotation: circuit.supports_key_rotation(),
        proving_key_path: &keys_paths.proving_key_path,
        verification_key_path: &keys_paths.verification_key_path,
    };
    let response: CertProofResponse = tool.invoke("generateCertProofInfo", &params).await?;

    let (signer_secrets, signer_public_keys) = split_keys(response.schnorr_keys);
    let (master_secrets, master_public_keys) = split_keys(response.master_keys);

    let info = CertificateProofInfo {
        threshold: response.threshold,
        gen_sys_constant: response.gen_sys_constant,
        verification_key: response.verification_key,
        signer_secrets,
        signer_public_keys,
        master_secrets,
        master_public_keys,
    };

    if info.signer_public_keys.len() != signer_count {
        return Err(ProofError::SignerCountMismatch {
            expected: signer_count,
            actual: info.signer_public_keys.len(),
        }
        .into());
    }
    if info.signer_secrets.len() != info.signer_public_keys.len() {
        return Err(ProofError::SignerKeyMismatch {
            secrets: info.signer_secrets.len(),
            public_keys: info.signer_public_keys.len(),
        }
        .into());
    }
    Ok(info)
}

fn split_keys(keys: Vec<SchnorrAccount>) -> (Vec<String>, Vec<String>) {
    keys.into_iter().map(|k| (k.secret, k.public_key)).unzip()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CswProofParams<'a> {
    withdrawal_epoch_len: u32,
    proving_key_path: &'a std::path::Path,
    verification_key_path: &'a std::path::Path,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CswProofResponse {
    verification_key: String,
}

/// Build the CSW proof descriptor (`generateCswProofInfo`).
///
/// Only invoked for ceasable sidechains with CSW enabled; callers store
/// [`CswProofInfo::Disabled`] otherwise.
pub async fn generate_csw_proof_info(
    tool: &BootstrapTool,
    withdrawal_epoch_length: u32,
    keys_paths: &ProofKeysPaths,
) -> Result<CswProofInfo, BridgeError> {
    let params = CswProofParams {
        withdrawal_epoch_len: withdrawal_epoch_length,
        proving_key_path: &keys_paths.proving_key_path,
        verification_key_path: &keys_paths.verification_key_path,
    };
    let response: CswProofResponse = tool.invoke("generateCswProofInfo", &params).await?;
    Ok(CswProofInfo::Enabled { verification_key: response.verification_key })
}
