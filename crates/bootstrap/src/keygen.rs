//! Batch key-material generation through the tool bridge.
//!
//! Each batch issues `n` sequential tool invocations with derived seeds
//! `"{seed}_{i+1}"`. Determinism (identical seed, identical keys) is the
//! tool's contract, not re-verified here. Any bridge failure propagates
//! unmodified: batches are all-or-nothing, never partial.

use crate::error::BridgeError;
use crate::tool::BootstrapTool;
use serde::Serialize;
use sidenet_types::{GenesisAccount, SchnorrAccount, VrfAccount};

#[derive(Serialize)]
struct KeySeed {
    seed: String,
}

fn derived_seed(seed: &str, i: usize) -> KeySeed {
    KeySeed { seed: format!("{}_{}", seed, i + 1) }
}

/// Generate `n` block-signing accounts (tool command `generatekey`).
pub async fn generate_secrets(
    tool: &BootstrapTool,
    seed: &str,
    n: usize,
) -> Result<Vec<GenesisAccount>, BridgeError> {
    let mut accounts = Vec::with_capacity(n);
    for i in 0..n {
        accounts.push(tool.invoke("generatekey", &derived_seed(seed, i)).await?);
    }
    Ok(accounts)
}

/// Generate `n` VRF key pairs (tool command `generateVrfKey`).
pub async fn generate_vrf_secrets(
    tool: &BootstrapTool,
    seed: &str,
    n: usize,
) -> Result<Vec<VrfAccount>, BridgeError> {
    let mut keys = Vec::with_capacity(n);
    for i in 0..n {
        keys.push(tool.invoke("generateVrfKey", &derived_seed(seed, i)).await?);
    }
    Ok(keys)
}

/// Generate `n` standalone Schnorr signer key pairs (tool command
/// `generateCertSignerKey`). Used by key-rotation scenarios that introduce
/// replacement signers after bootstrap.
pub async fn generate_cert_signer_secrets(
    tool: &BootstrapTool,
    seed: &str,
    n: usize,
) -> Result<Vec<SchnorrAccount>, BridgeError> {
    let mut keys = Vec::with_capacity(n);
    for i in 0..n {
        keys.push(tool.invoke("generateCertSignerKey", &derived_seed(seed, i)).await?);
    }
    Ok(keys)
}
