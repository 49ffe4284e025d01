//! Certificate and CSW proof descriptors.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Validation failures for proof descriptors.
#[derive(Debug, Error)]
pub enum ProofError {
    /// Signer secret and public key arrays must stay aligned.
    #[error("signer key arrays diverge: {secrets} secrets vs {public_keys} public keys")]
    SignerKeyMismatch {
        /// Number of signer secrets.
        secrets: usize,
        /// Number of signer public keys.
        public_keys: usize,
    },

    /// Master key arrays must stay aligned (key-rotation circuit only).
    #[error("master key arrays diverge: {secrets} secrets vs {public_keys} public keys")]
    MasterKeyMismatch {
        /// Number of master secrets.
        secrets: usize,
        /// Number of master public keys.
        public_keys: usize,
    },

    /// The threshold can never exceed the number of signer keys.
    #[error("signature threshold {threshold} exceeds signer key count {max_keys}")]
    ThresholdTooHigh {
        /// Requested signature threshold.
        threshold: usize,
        /// Number of signer keys generated.
        max_keys: usize,
    },

    /// The descriptor holds a different number of signers than requested.
    #[error("expected {expected} signer keys, descriptor holds {actual}")]
    SignerCountMismatch {
        /// Number of keys requested at generation time.
        expected: usize,
        /// Number of keys in the descriptor.
        actual: usize,
    },
}

/// Filesystem locations of precomputed SNARK proving material.
///
/// Read-only after creation and shared by reference across all nodes of one
/// sidechain; no single node owns these files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofKeysPaths {
    /// Path to the proving key file.
    pub proving_key_path: PathBuf,
    /// Path to the verification key file.
    pub verification_key_path: PathBuf,
}

impl ProofKeysPaths {
    /// Certificate proof key locations under the shared key directory.
    pub fn for_certificate(dir: &Path) -> Self {
        Self {
            proving_key_path: dir.join("cert_marlin_snark_pk"),
            verification_key_path: dir.join("cert_marlin_snark_vk"),
        }
    }

    /// CSW proof key locations; keyed by withdrawal epoch length because the
    /// circuit size depends on it.
    pub fn for_csw(dir: &Path, withdrawal_epoch_length: u32) -> Self {
        Self {
            proving_key_path: dir.join(format!("csw_marlin_snark_pk_{withdrawal_epoch_length}")),
            verification_key_path: dir.join(format!("csw_marlin_snark_vk_{withdrawal_epoch_length}")),
        }
    }
}

/// Certificate proof descriptor for one sidechain.
///
/// Built once per sidechain at bootstrap by merging the tool's
/// `generateCertProofInfo` output (threshold, system constant, verification
/// key, public keys) with the locally held signer secrets. Master keys are
/// only present for the key-rotation circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateProofInfo {
    /// Signature threshold: minimum signers for a valid certificate.
    pub threshold: usize,
    /// Circuit system constant generated by the tool.
    pub gen_sys_constant: String,
    /// Certificate verification key, hex encoded.
    pub verification_key: String,
    /// Signer secret keys, hex encoded.
    pub signer_secrets: Vec<String>,
    /// Signer public keys, hex encoded; aligned with `signer_secrets`.
    pub signer_public_keys: Vec<String>,
    /// Master secret keys (key-rotation circuit only).
    #[serde(default)]
    pub master_secrets: Vec<String>,
    /// Master public keys (key-rotation circuit only).
    #[serde(default)]
    pub master_public_keys: Vec<String>,
}

impl CertificateProofInfo {
    /// Number of signer key pairs in the descriptor.
    pub fn max_keys(&self) -> usize {
        self.signer_public_keys.len()
    }

    /// Check the structural invariants against the requested key count.
    pub fn validate(&self, cert_max_keys: usize) -> Result<(), ProofError> {
        if self.signer_secrets.len() != self.signer_public_keys.len() {
            return Err(ProofError::SignerKeyMismatch {
                secrets: self.signer_secrets.len(),
                public_keys: self.signer_public_keys.len(),
            });
        }
        if self.master_secrets.len() != self.master_public_keys.len() {
            return Err(ProofError::MasterKeyMismatch {
                secrets: self.master_secrets.len(),
                public_keys: self.master_public_keys.len(),
            });
        }
        if self.signer_public_keys.len() != cert_max_keys {
            return Err(ProofError::SignerCountMismatch {
                expected: cert_max_keys,
                actual: self.signer_public_keys.len(),
            });
        }
        if self.threshold > cert_max_keys {
            return Err(ProofError::ThresholdTooHigh {
                threshold: self.threshold,
                max_keys: cert_max_keys,
            });
        }
        Ok(())
    }
}

/// Ceased-sidechain-withdrawal proof material.
///
/// Non-ceasing sidechains (and ceasable ones with CSW turned off) carry the
/// explicit `Disabled` placeholder rather than an unexamined null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CswProofInfo {
    /// CSW is not enabled for this sidechain.
    Disabled,
    /// CSW is enabled; the verification key is embedded in the creation tx.
    Enabled {
        /// CSW verification key, hex encoded.
        verification_key: String,
    },
}

impl CswProofInfo {
    /// Verification key to embed in the sidechain creation request, if any.
    pub fn verification_key(&self) -> Option<&str> {
        match self {
            CswProofInfo::Disabled => None,
            CswProofInfo::Enabled { verification_key } => Some(verification_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof_info(signers: usize, threshold: usize) -> CertificateProofInfo {
        CertificateProofInfo {
            threshold,
            gen_sys_constant: "c0ffee".into(),
            verification_key: "beef".into(),
            signer_secrets: (0..signers).map(|i| format!("sk{i}")).collect(),
            signer_public_keys: (0..signers).map(|i| format!("pk{i}")).collect(),
            master_secrets: Vec::new(),
            master_public_keys: Vec::new(),
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(proof_info(7, 5).validate(7).is_ok());
    }

    #[test]
    fn diverging_signer_arrays_rejected() {
        let mut info = proof_info(7, 5);
        info.signer_secrets.pop();
        assert!(matches!(
            info.validate(7),
            Err(ProofError::SignerKeyMismatch { secrets: 6, public_keys: 7 })
        ));
    }

    #[test]
    fn threshold_above_key_count_rejected() {
        let info = proof_info(3, 4);
        assert!(matches!(
            info.validate(3),
            Err(ProofError::ThresholdTooHigh { threshold: 4, max_keys: 3 })
        ));
    }

    #[test]
    fn wrong_signer_count_rejected() {
        let info = proof_info(5, 3);
        assert!(matches!(
            info.validate(7),
            Err(ProofError::SignerCountMismatch { expected: 7, actual: 5 })
        ));
    }

    #[test]
    fn csw_disabled_has_no_verification_key() {
        assert_eq!(CswProofInfo::Disabled.verification_key(), None);
        let enabled = CswProofInfo::Enabled { verification_key: "vk".into() };
        assert_eq!(enabled.verification_key(), Some("vk"));
    }

    #[test]
    fn csw_keys_paths_encode_epoch_length() {
        let paths = ProofKeysPaths::for_csw(Path::new("/keys"), 148);
        assert!(paths.proving_key_path.ends_with("csw_marlin_snark_pk_148"));
        assert!(paths.verification_key_path.ends_with("csw_marlin_snark_vk_148"));
    }
}
