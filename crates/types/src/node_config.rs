//! Per-node configuration consumed by the configuration renderer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default timeout in seconds for a node's REST API.
pub const DEFAULT_REST_API_TIMEOUT_SECS: u64 = 5;

/// Default cap on incoming peer connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 100;

/// Default mempool tunables for account-model sidechains.
pub const DEFAULT_MAX_NONCE_GAP: u32 = 16;
/// Default per-account mempool slot count.
pub const DEFAULT_MAX_ACCOUNT_SLOTS: u32 = 16;
/// Default total mempool slot count.
pub const DEFAULT_MAX_MEMPOOL_SLOTS: u32 = 6144;
/// Default slot count reserved for non-executable transactions.
pub const DEFAULT_MAX_NONEXEC_POOL_SLOTS: u32 = 1024;
/// Default transaction lifetime in seconds.
pub const DEFAULT_TX_LIFETIME_SECS: u64 = 3600;

/// Log verbosity levels understood by the node's logging backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    All,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Off => "off",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::All => "all",
        };
        f.write_str(s)
    }
}

/// Websocket connection parameters towards the mainchain node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McConnectionInfo {
    /// Websocket address, e.g. `ws://127.0.0.1:8888`.
    pub address: String,
    /// Connection timeout in milliseconds.
    pub connection_timeout_ms: u64,
    /// Delay between reconnection attempts, in seconds.
    pub reconnection_delay_secs: u64,
    /// Maximum number of reconnection attempts.
    pub reconnection_max_attempts: u32,
}

impl Default for McConnectionInfo {
    fn default() -> Self {
        Self {
            address: "ws://localhost:0".to_string(),
            connection_timeout_ms: 100,
            reconnection_delay_secs: 1,
            reconnection_max_attempts: 1,
        }
    }
}

/// Forging behavior for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgerConfiguration {
    /// Whether the node forges blocks automatically.
    pub automatic_forging: bool,
    /// Restrict forging to the allow-list below.
    pub restrict_forgers: bool,
    /// Public keys allowed to forge when restricted.
    pub allowed_forgers: Vec<String>,
}

impl Default for ForgerConfiguration {
    fn default() -> Self {
        Self {
            automatic_forging: true,
            restrict_forgers: false,
            allowed_forgers: Vec::new(),
        }
    }
}

/// Configuration for a single sidechain node.
///
/// Built per node from the sidechain template and consumed exactly once by
/// the configuration renderer. Anything not listed here comes from the shared
/// [`crate::SidechainBootstrapInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfiguration {
    /// Mainchain websocket connection parameters.
    pub mc_connection_info: McConnectionInfo,
    /// API key protecting the node's REST control API.
    pub api_key: String,
    /// Cap on incoming peer connections.
    pub max_connections: u32,
    /// Whether this node submits certificates to the mainchain.
    pub cert_submitter_enabled: bool,
    /// Whether this node signs certificates.
    pub cert_signing_enabled: bool,
    /// Port for the node's own websocket server, if enabled.
    pub websocket_server_port: Option<u16>,
    /// Indexes into the sidechain's signer key set owned by this node.
    ///
    /// `None` means the node holds every signer key (the original default).
    pub submitter_key_indexes: Option<Vec<usize>>,
    /// Forging behavior.
    pub forger: ForgerConfiguration,
    /// REST API timeout in seconds.
    pub rest_api_timeout_secs: u64,
    /// Compute the certificate fee automatically.
    pub automatic_fee_computation: bool,
    /// Fixed certificate fee used when automatic computation is off.
    pub certificate_fee: String,
    /// Maximum nonce gap accepted by the account-model mempool.
    pub max_nonce_gap: u32,
    /// Mempool slots per account.
    pub max_account_slots: u32,
    /// Total mempool slots.
    pub max_mempool_slots: u32,
    /// Mempool slots for non-executable transactions.
    pub max_nonexec_pool_slots: u32,
    /// Transaction lifetime in seconds.
    pub tx_lifetime_secs: u64,
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self {
            mc_connection_info: McConnectionInfo::default(),
            api_key: "Horizen".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            cert_submitter_enabled: false,
            cert_signing_enabled: false,
            websocket_server_port: None,
            submitter_key_indexes: None,
            forger: ForgerConfiguration::default(),
            rest_api_timeout_secs: DEFAULT_REST_API_TIMEOUT_SECS,
            automatic_fee_computation: true,
            certificate_fee: "0.0001".to_string(),
            max_nonce_gap: DEFAULT_MAX_NONCE_GAP,
            max_account_slots: DEFAULT_MAX_ACCOUNT_SLOTS,
            max_mempool_slots: DEFAULT_MAX_MEMPOOL_SLOTS,
            max_nonexec_pool_slots: DEFAULT_MAX_NONEXEC_POOL_SLOTS,
            tx_lifetime_secs: DEFAULT_TX_LIFETIME_SECS,
        }
    }
}
