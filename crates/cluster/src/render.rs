//! Node configuration rendering.
//!
//! Templates carry `${KEY}` placeholders. Every placeholder must resolve;
//! a template key with no substitution is a hard error rather than a
//! half-rendered file a node would choke on at startup. Multi-line values
//! travel through the map as the literal two-character `\n` marker and
//! are unescaped after substitution.

use sidenet_types::{LogLevel, NodeConfiguration, SidechainBootstrapInfo};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ports::NodePorts;

/// Ordered substitution map; deterministic iteration keeps rendered
/// configs diffable across runs.
pub type SubstitutionMap = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The template references a key the map does not hold.
    #[error("template references unknown placeholder `${{{key}}}`")]
    MissingKey {
        /// Placeholder key as written in the template.
        key: String,
    },

    /// A `${` opener with no closing brace.
    #[error("unterminated placeholder starting at byte {position}")]
    UnterminatedPlaceholder {
        /// Byte offset of the `${` opener.
        position: usize,
    },
}

/// Substitute every `${KEY}` placeholder in `template`.
pub fn render(template: &str, substitutions: &SubstitutionMap) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0usize;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after_opener = &rest[start + 2..];
        let end = after_opener.find('}').ok_or(RenderError::UnterminatedPlaceholder {
            position: consumed + start,
        })?;
        let key = &after_opener[..end];
        let value = substitutions
            .get(key)
            .ok_or_else(|| RenderError::MissingKey { key: key.to_owned() })?;
        out.push_str(value);
        consumed += start + 2 + end + 1;
        rest = &after_opener[end + 1..];
    }
    out.push_str(rest);

    Ok(out.replace("\\n", "\n"))
}

/// Create the per-node directory under `dir` and write `node{index}.conf`.
///
/// Returns the path of the written file.
pub fn write_node_config(
    dir: &Path,
    node_index: usize,
    contents: &str,
) -> std::io::Result<PathBuf> {
    let node_dir = dir.join(format!("node{node_index}"));
    fs::create_dir_all(&node_dir)?;
    let path = node_dir.join(format!("node{node_index}.conf"));
    fs::write(&path, contents)?;
    Ok(path)
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_owned())
}

/// Build the full substitution map for one node.
///
/// Merges the shared bootstrap descriptor, the node's own configuration and
/// its allocated ports. Node 0 receives the genesis secret through
/// `GENESIS_SECRET`; redacted descriptors render it empty. Signer secrets
/// are filtered by the node's submitter key indexes, so a node's config
/// never carries keys it does not own.
pub fn substitutions_for_node(
    info: &SidechainBootstrapInfo,
    config: &NodeConfiguration,
    ports: NodePorts,
    node_index: usize,
    node_dir: &Path,
    log_file_level: LogLevel,
    log_console_level: LogLevel,
) -> SubstitutionMap {
    let proof = &info.certificate_proof_info;
    let submitter_secrets: Vec<String> = match &config.submitter_key_indexes {
        Some(indexes) => indexes
            .iter()
            .filter_map(|&i| proof.signer_secrets.get(i).cloned())
            .collect(),
        None => proof.signer_secrets.clone(),
    };

    let mut map = SubstitutionMap::new();
    map.insert("NODE_NUMBER".into(), node_index.to_string());
    map.insert("DIRECTORY".into(), node_dir.display().to_string());
    map.insert("LOG_FILE_LEVEL".into(), log_file_level.to_string());
    map.insert("LOG_CONSOLE_LEVEL".into(), log_console_level.to_string());

    map.insert("API_PORT".into(), ports.rpc.to_string());
    map.insert("BIND_PORT".into(), ports.p2p.to_string());
    map.insert(
        "WEBSOCKET_PORT".into(),
        config
            .websocket_server_port
            .unwrap_or(ports.websocket)
            .to_string(),
    );
    map.insert("API_TIMEOUT".into(), format!("{}s", config.rest_api_timeout_secs));
    map.insert("API_KEY".into(), config.api_key.clone());
    map.insert("MAX_CONNECTIONS".into(), config.max_connections.to_string());

    map.insert("MC_CONNECTION_ADDRESS".into(), config.mc_connection_info.address.clone());
    map.insert(
        "MC_CONNECTION_TIMEOUT".into(),
        format!("{}ms", config.mc_connection_info.connection_timeout_ms),
    );
    map.insert(
        "MC_RECONNECTION_DELAY".into(),
        format!("{}s", config.mc_connection_info.reconnection_delay_secs),
    );
    map.insert(
        "MC_RECONNECTION_MAX_ATTEMPTS".into(),
        config.mc_connection_info.reconnection_max_attempts.to_string(),
    );

    map.insert("SIDECHAIN_ID".into(), info.sidechain_id.clone());
    map.insert("GENESIS_BLOCK_HEX".into(), info.genesis_block_hex.clone());
    map.insert("POW_DATA".into(), info.pow_data.clone());
    map.insert("BLOCK_HEIGHT".into(), info.mainchain_block_height.to_string());
    map.insert("NETWORK".into(), info.network.clone());
    map.insert(
        "WITHDRAWAL_EPOCH_LENGTH".into(),
        info.withdrawal_epoch_length.to_string(),
    );
    map.insert(
        "INITIAL_CUMULATIVE_COMM_TREE_HASH".into(),
        info.initial_cumulative_comm_tree_hash.clone(),
    );
    map.insert(
        "GENESIS_SECRET".into(),
        info.genesis_account
            .as_ref()
            .map(|a| a.secret.clone())
            .unwrap_or_default(),
    );
    map.insert("VRF_SECRET".into(), info.genesis_vrf_account.secret.clone());
    map.insert("VRF_PUBLIC_KEY".into(), info.genesis_vrf_account.public_key.clone());

    map.insert("THRESHOLD".into(), proof.threshold.to_string());
    map.insert("MAX_PKS".into(), proof.max_keys().to_string());
    map.insert("SIGNER_PUBLIC_KEYS".into(), json_list(&proof.signer_public_keys));
    map.insert("MASTER_PUBLIC_KEYS".into(), json_list(&proof.master_public_keys));
    map.insert("SUBMITTER_SECRETS".into(), json_list(&submitter_secrets));
    map.insert(
        "CERT_PROVING_KEY_PATH".into(),
        info.cert_keys_paths.proving_key_path.display().to_string(),
    );
    map.insert(
        "CERT_VERIFICATION_KEY_PATH".into(),
        info.cert_keys_paths.verification_key_path.display().to_string(),
    );
    map.insert(
        "CSW_PROVING_KEY_PATH".into(),
        info.csw_keys_paths.proving_key_path.display().to_string(),
    );
    map.insert(
        "CSW_VERIFICATION_KEY_PATH".into(),
        info.csw_keys_paths.verification_key_path.display().to_string(),
    );
    map.insert(
        "CSW_ENABLED".into(),
        info.csw_proof_info.verification_key().is_some().to_string(),
    );

    map.insert(
        "CERT_SUBMITTER_ENABLED".into(),
        config.cert_submitter_enabled.to_string(),
    );
    map.insert("CERT_SIGNING_ENABLED".into(), config.cert_signing_enabled.to_string());
    map.insert(
        "AUTOMATIC_FEE_COMPUTATION".into(),
        config.automatic_fee_computation.to_string(),
    );
    map.insert("CERTIFICATE_FEE".into(), config.certificate_fee.clone());

    map.insert("AUTOMATIC_FORGING".into(), config.forger.automatic_forging.to_string());
    map.insert("RESTRICT_FORGERS".into(), config.forger.restrict_forgers.to_string());
    map.insert("ALLOWED_FORGERS".into(), json_list(&config.forger.allowed_forgers));

    map.insert("MAX_NONCE_GAP".into(), config.max_nonce_gap.to_string());
    map.insert("MAX_ACCOUNT_SLOTS".into(), config.max_account_slots.to_string());
    map.insert("MAX_MEMPOOL_SLOTS".into(), config.max_mempool_slots.to_string());
    map.insert(
        "MAX_NONEXEC_POOL_SLOTS".into(),
        config.max_nonexec_pool_slots.to_string(),
    );
    map.insert("TX_LIFETIME".into(), format!("{}s", config.tx_lifetime_secs));

    map
}
