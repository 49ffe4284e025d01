//! Cryptographic bootstrap sequencing for sidenet test networks.
//!
//! A sidechain cannot start from nothing: before the first node process is
//! launched, someone must generate forging and certificate-signing keys,
//! build the certificate proof descriptor, register the sidechain on the
//! mainchain, and assemble the genesis payload every node embeds in its
//! configuration. This crate implements that sequence.
//!
//! The orchestrator has no cryptography of its own. All key and proof
//! material is produced by an external command-line tool, reached through
//! [`BootstrapTool`]; the mainchain is reached through the
//! [`MainchainClient`] trait. [`GenesisAssembler`] drives both in the fixed
//! order the bootstrap protocol requires and emits an immutable
//! [`sidenet_types::SidechainBootstrapInfo`].

pub mod assembler;
pub mod error;
pub mod keygen;
pub mod mainchain;
pub mod proof;
pub mod tool;

pub use assembler::{GenesisAssembler, DEFAULT_KEY_SEED};
pub use error::{BootstrapError, BridgeError, StepError};
pub use keygen::{generate_cert_signer_secrets, generate_secrets, generate_vrf_secrets};
pub use mainchain::{
    MainchainClient, MainchainError, MainchainRpcClient, ScCreateResponse,
    SidechainCreationRequest,
};
pub use proof::{generate_certificate_proof_info, generate_csw_proof_info, ProofBuildError};
pub use tool::{BootstrapTool, SIDENET_TOOL_ENV};
