//! Sidechain creation parameters and the circuit/version decision table.

use crate::node_config::NodeConfiguration;
use crate::LARGE_WITHDRAWAL_EPOCH_LENGTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid sidechain parameter combinations.
///
/// All of these are rejected at the orchestrator boundary, before any
/// subprocess is spawned.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Non-ceasing sidechains only exist from creation version 2 onwards.
    #[error("non-ceasing sidechains require creation version 2, got version {0}")]
    NonCeasingRequiresV2(u8),

    /// The key-rotation circuit only exists from creation version 2 onwards.
    #[error("key-rotation circuit requires creation version 2, got version {0}")]
    KeyRotationRequiresV2(u8),

    /// The signature threshold must not exceed the signer key count.
    #[error("certificate threshold {threshold} exceeds max signer keys {max_keys}")]
    ThresholdTooHigh {
        /// Requested signature threshold.
        threshold: usize,
        /// Number of signer keys.
        max_keys: usize,
    },

    /// More submitter key assignments than nodes.
    #[error("submitter key assignments for {assignments} nodes but sidechain has {nodes}")]
    TooManySubmitterAssignments {
        /// Number of per-node key index lists supplied.
        assignments: usize,
        /// Number of nodes in the sidechain.
        nodes: usize,
    },

    /// A node claims a signer key index outside the generated key set.
    #[error("node {node} claims signer key index {index}, only {max_keys} keys exist")]
    SubmitterIndexOutOfRange {
        /// Node index within the sidechain.
        node: usize,
        /// Offending signer key index.
        index: usize,
        /// Number of signer keys.
        max_keys: usize,
    },

    /// A sidechain needs at least one node.
    #[error("sidechain configuration holds no nodes")]
    NoNodes,
}

/// Certificate proof circuit variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateCircuitType {
    /// Plain threshold-signature circuit; signer keys are fixed for life.
    #[serde(rename = "NaiveThresholdSignatureCircuit")]
    NaiveThresholdSignature,
    /// Threshold circuit with signer/master key rotation support.
    #[serde(rename = "NaiveThresholdSignatureCircuitWithKeyRotation")]
    NaiveThresholdSignatureWithKeyRotation,
}

impl CertificateCircuitType {
    /// Whether this circuit carries rotatable master keys.
    pub fn supports_key_rotation(&self) -> bool {
        matches!(self, CertificateCircuitType::NaiveThresholdSignatureWithKeyRotation)
    }
}

/// Sidechain creation transaction versions understood by the mainchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScCreationVersion {
    /// Original creation format.
    V1,
    /// Adds key rotation and non-ceasing support.
    V2,
}

impl ScCreationVersion {
    /// Numeric version as carried in the creation transaction.
    pub fn as_u8(&self) -> u8 {
        match self {
            ScCreationVersion::V1 => 1,
            ScCreationVersion::V2 => 2,
        }
    }
}

/// Per-sidechain overrides supplied by the test runner.
///
/// Replaces the original free-form JSON option bag: deserialized once from
/// the runner's `--sidechain-opts` map and validated before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidechainOptions {
    /// Run the sidechain in non-ceasing mode.
    #[serde(default)]
    pub nonceasing: bool,
    /// Override the certificate circuit type.
    #[serde(default)]
    pub certcircuittype: Option<CertificateCircuitType>,
}

impl SidechainOptions {
    /// Resolve the effective circuit type and creation version.
    ///
    /// Key rotation and non-ceasing mode both force creation version 2; the
    /// plain circuit on a ceasable sidechain keeps version 1.
    pub fn resolve(&self) -> (CertificateCircuitType, ScCreationVersion) {
        let circuit = self
            .certcircuittype
            .unwrap_or(CertificateCircuitType::NaiveThresholdSignature);
        let version = if circuit.supports_key_rotation() || self.nonceasing {
            ScCreationVersion::V2
        } else {
            ScCreationVersion::V1
        };
        (circuit, version)
    }
}

/// Parameters of the sidechain creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainCreationInfo {
    /// Amount forwarded to the genesis account, in coins.
    pub forward_amount: u64,
    /// Withdrawal epoch length in mainchain blocks.
    pub withdrawal_epoch_length: u32,
    /// Creation transaction version.
    pub creation_version: ScCreationVersion,
    /// Whether the sidechain never ceases.
    pub is_non_ceasing: bool,
    /// Certificate circuit variant.
    pub circuit_type: CertificateCircuitType,
    /// Number of certificate signer keys to generate.
    pub cert_max_keys: usize,
    /// Certificate signature threshold.
    pub cert_sig_threshold: usize,
    /// Backward-transfer request data length (field elements).
    pub btr_data_length: u32,
    /// Whether CSW proof material should be generated.
    pub csw_enabled: bool,
}

impl Default for SidechainCreationInfo {
    fn default() -> Self {
        Self {
            forward_amount: 100,
            withdrawal_epoch_length: LARGE_WITHDRAWAL_EPOCH_LENGTH,
            creation_version: ScCreationVersion::V1,
            is_non_ceasing: false,
            circuit_type: CertificateCircuitType::NaiveThresholdSignature,
            cert_max_keys: crate::DEFAULT_CERT_MAX_KEYS,
            cert_sig_threshold: crate::DEFAULT_CERT_SIG_THRESHOLD,
            btr_data_length: 0,
            csw_enabled: true,
        }
    }
}

impl SidechainCreationInfo {
    /// Reject invalid parameter combinations.
    ///
    /// Called by the orchestrator before any key is generated or any process
    /// is spawned; the downstream builders do not re-validate.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.is_non_ceasing && self.creation_version == ScCreationVersion::V1 {
            return Err(ConfigurationError::NonCeasingRequiresV2(
                self.creation_version.as_u8(),
            ));
        }
        if self.circuit_type.supports_key_rotation()
            && self.creation_version == ScCreationVersion::V1
        {
            return Err(ConfigurationError::KeyRotationRequiresV2(
                self.creation_version.as_u8(),
            ));
        }
        if self.cert_sig_threshold > self.cert_max_keys {
            return Err(ConfigurationError::ThresholdTooHigh {
                threshold: self.cert_sig_threshold,
                max_keys: self.cert_max_keys,
            });
        }
        Ok(())
    }

    /// Apply runner-level overrides, keeping the decision table consistent.
    ///
    /// Options only tighten the creation parameters: requesting non-ceasing
    /// or a key-rotation circuit upgrades the version to 2, and a non-ceasing
    /// sidechain loses its CSW material. Absent options change nothing, so a
    /// directly constructed creation survives a default option set intact.
    pub fn with_options(mut self, options: &SidechainOptions) -> Self {
        if options.nonceasing {
            self.is_non_ceasing = true;
        }
        if let Some(circuit) = options.certcircuittype {
            self.circuit_type = circuit;
        }
        if self.circuit_type.supports_key_rotation() || self.is_non_ceasing {
            self.creation_version = ScCreationVersion::V2;
        }
        // Non-ceasing sidechains never cease, so CSW material is pointless.
        if self.is_non_ceasing {
            self.csw_enabled = false;
        }
        self
    }
}

/// Full configuration for one sidechain: creation parameters plus one
/// [`NodeConfiguration`] per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidechainConfiguration {
    /// Creation transaction parameters.
    pub creation: SidechainCreationInfo,
    /// Per-node configuration, index-aligned with node directories.
    pub nodes: Vec<NodeConfiguration>,
}

impl SidechainConfiguration {
    /// Validate creation parameters and per-node key assignments together.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.creation.validate()?;
        if self.nodes.is_empty() {
            return Err(ConfigurationError::NoNodes);
        }
        let with_indexes = self
            .nodes
            .iter()
            .filter(|n| n.submitter_key_indexes.is_some())
            .count();
        if with_indexes > self.nodes.len() {
            return Err(ConfigurationError::TooManySubmitterAssignments {
                assignments: with_indexes,
                nodes: self.nodes.len(),
            });
        }
        for (node, config) in self.nodes.iter().enumerate() {
            if let Some(indexes) = &config.submitter_key_indexes {
                for &index in indexes {
                    if index >= self.creation.cert_max_keys {
                        return Err(ConfigurationError::SubmitterIndexOutOfRange {
                            node,
                            index,
                            max_keys: self.creation.cert_max_keys,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ceasing_with_v1_is_rejected() {
        let creation = SidechainCreationInfo {
            is_non_ceasing: true,
            creation_version: ScCreationVersion::V1,
            ..Default::default()
        };
        assert!(matches!(
            creation.validate(),
            Err(ConfigurationError::NonCeasingRequiresV2(1))
        ));
    }

    #[test]
    fn key_rotation_with_v1_is_rejected() {
        let creation = SidechainCreationInfo {
            circuit_type: CertificateCircuitType::NaiveThresholdSignatureWithKeyRotation,
            creation_version: ScCreationVersion::V1,
            ..Default::default()
        };
        assert!(creation.validate().is_err());
    }

    #[test]
    fn options_force_v2_for_key_rotation() {
        let options = SidechainOptions {
            nonceasing: false,
            certcircuittype: Some(CertificateCircuitType::NaiveThresholdSignatureWithKeyRotation),
        };
        let (circuit, version) = options.resolve();
        assert!(circuit.supports_key_rotation());
        assert_eq!(version, ScCreationVersion::V2);
    }

    #[test]
    fn options_force_v2_for_non_ceasing() {
        let options = SidechainOptions { nonceasing: true, certcircuittype: None };
        let (_, version) = options.resolve();
        assert_eq!(version, ScCreationVersion::V2);
    }

    #[test]
    fn non_ceasing_disables_csw() {
        let options = SidechainOptions { nonceasing: true, certcircuittype: None };
        let creation = SidechainCreationInfo::default().with_options(&options);
        assert!(creation.is_non_ceasing);
        assert!(!creation.csw_enabled);
        assert!(creation.validate().is_ok());
    }

    #[test]
    fn default_options_leave_the_creation_untouched() {
        let creation = SidechainCreationInfo {
            is_non_ceasing: true,
            creation_version: ScCreationVersion::V2,
            csw_enabled: false,
            ..Default::default()
        };
        let merged = creation.clone().with_options(&SidechainOptions::default());
        assert_eq!(merged, creation);
    }

    #[test]
    fn threshold_above_max_keys_is_rejected() {
        let creation = SidechainCreationInfo {
            cert_max_keys: 4,
            cert_sig_threshold: 5,
            ..Default::default()
        };
        assert!(matches!(
            creation.validate(),
            Err(ConfigurationError::ThresholdTooHigh { threshold: 5, max_keys: 4 })
        ));
    }

    #[test]
    fn submitter_index_out_of_range_is_rejected() {
        let mut node = NodeConfiguration::default();
        node.submitter_key_indexes = Some(vec![0, 7]);
        let config = SidechainConfiguration {
            creation: SidechainCreationInfo::default(),
            nodes: vec![node],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::SubmitterIndexOutOfRange { node: 0, index: 7, max_keys: 7 })
        ));
    }

    #[test]
    fn options_deserialize_from_runner_json() {
        let options: SidechainOptions = serde_json::from_str(
            r#"{"nonceasing": true, "certcircuittype": "NaiveThresholdSignatureCircuitWithKeyRotation"}"#,
        )
        .unwrap();
        assert!(options.nonceasing);
        assert!(options.certcircuittype.unwrap().supports_key_rotation());
    }

    #[test]
    fn unknown_option_keys_are_rejected() {
        let result = serde_json::from_str::<SidechainOptions>(r#"{"noncesing": true}"#);
        assert!(result.is_err());
    }
}
