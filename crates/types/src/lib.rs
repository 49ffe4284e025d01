//! Core data model for the sidenet test-network orchestration engine.
//!
//! These types describe everything a multi-chain test environment needs to
//! bootstrap and run: key material produced by the external bootstrapping
//! tool, certificate-proof descriptors, the immutable per-sidechain bootstrap
//! descriptor, per-node configuration, and the typed sidechain creation
//! parameters (certificate circuit variant, creation version).
//!
//! Everything here is plain data: produced once during bootstrap and treated
//! as immutable afterwards. No component in the workspace mutates another
//! component's output in place.

pub mod account;
pub mod bootstrap_info;
pub mod node_config;
pub mod proof;
pub mod sidechain;

pub use account::{GenesisAccount, SchnorrAccount, VrfAccount};
pub use bootstrap_info::SidechainBootstrapInfo;
pub use node_config::{
    ForgerConfiguration, LogLevel, McConnectionInfo, NodeConfiguration,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_REST_API_TIMEOUT_SECS,
};
pub use proof::{CertificateProofInfo, CswProofInfo, ProofError, ProofKeysPaths};
pub use sidechain::{
    CertificateCircuitType, ConfigurationError, ScCreationVersion, SidechainConfiguration,
    SidechainCreationInfo, SidechainOptions,
};

/// Withdrawal epoch length used by tests that never reach an epoch boundary.
pub const LARGE_WITHDRAWAL_EPOCH_LENGTH: u32 = 900;

/// Default number of certificate signer keys per sidechain.
pub const DEFAULT_CERT_MAX_KEYS: usize = 7;

/// Default certificate signature threshold.
pub const DEFAULT_CERT_SIG_THRESHOLD: usize = 5;

/// Default rewind (in seconds) applied to the declared genesis timestamp.
///
/// Freshly bootstrapped nodes otherwise reject their own genesis block as
/// "in the future". Half of a consensus epoch: 720 slots of 120 seconds.
pub const DEFAULT_BLOCK_TIMESTAMP_REWIND: u64 = 720 * 120 / 2;
