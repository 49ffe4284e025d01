//! End-to-end bootstrap sequence tests against a scripted stand-in tool.
//!
//! The real tool is a heavyweight external executable, so these tests drop a
//! small shell script into a temp directory that answers each command with
//! canned JSON and logs every invocation. The mainchain is an in-memory
//! recording fake.

use async_trait::async_trait;
use sidenet_bootstrap::{
    generate_cert_signer_secrets, generate_certificate_proof_info, generate_secrets,
    BootstrapTool, BridgeError, GenesisAssembler, MainchainClient, MainchainError,
    ScCreateResponse, SidechainCreationRequest,
};
use sidenet_types::{
    CertificateCircuitType, CswProofInfo, ProofKeysPaths, ScCreationVersion,
    SidechainCreationInfo, DEFAULT_BLOCK_TIMESTAMP_REWIND,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

const FAKE_TOOL: &str = r#"#!/bin/sh
echo "$1 $2" >> "$(dirname "$0")/calls.log"
case "$1" in
  generatekey)
    echo '{"secret":"gsk","publicKey":"gpk"}' ;;
  generateVrfKey)
    echo '{"vrfSecret":"vsk","vrfPublicKey":"vpk"}' ;;
  generateCertSignerKey)
    echo '{"schnorrSecret":"ssk","schnorrPublicKey":"spk"}' ;;
  generateCertProofInfo)
    echo '{"threshold":5,"verificationKey":"certvk","genSysConstant":"sysconst","schnorrKeys":[{"schnorrSecret":"ssk1","schnorrPublicKey":"spk1"},{"schnorrSecret":"ssk2","schnorrPublicKey":"spk2"},{"schnorrSecret":"ssk3","schnorrPublicKey":"spk3"},{"schnorrSecret":"ssk4","schnorrPublicKey":"spk4"},{"schnorrSecret":"ssk5","schnorrPublicKey":"spk5"},{"schnorrSecret":"ssk6","schnorrPublicKey":"spk6"},{"schnorrSecret":"ssk7","schnorrPublicKey":"spk7"}]}' ;;
  generateCswProofInfo)
    echo '{"verificationKey":"cswvk"}' ;;
  genesisinfo)
    echo '{"scGenesisBlockHex":"beef","powData":"pow","mcBlockHeight":221,"mcNetwork":"regtest","withdrawalEpochLength":900,"initialCumulativeCommTreeHash":"cumhash"}' ;;
  boom)
    echo 'this is not json' ;;
  fail)
    echo 'kaput' >&2
    exit 3 ;;
esac
"#;

fn fake_tool(dir: &Path) -> BootstrapTool {
    let script = dir.join("fake-tool.sh");
    fs::write(&script, FAKE_TOOL).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    BootstrapTool::new(&script)
}

fn tool_calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

struct RecordingMainchain {
    creation_requests: Mutex<Vec<String>>,
}

impl RecordingMainchain {
    fn new() -> Self {
        Self { creation_requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl MainchainClient for RecordingMainchain {
    async fn create_sidechain(
        &self,
        request: &SidechainCreationRequest,
    ) -> Result<ScCreateResponse, MainchainError> {
        let json = serde_json::to_string(request).unwrap();
        self.creation_requests.lock().unwrap().push(json);
        Ok(ScCreateResponse { txid: "aabbcc".into(), scid: "sc-2f7a".into() })
    }

    async fn generate_blocks(&self, count: u32) -> Result<Vec<String>, MainchainError> {
        Ok((0..count).map(|i| format!("blockhash{i}")).collect())
    }

    async fn sidechain_genesis_info(&self, _sidechain_id: &str) -> Result<String, MainchainError> {
        Ok("rawgenesisinfo".into())
    }

    async fn block_count(&self) -> Result<u64, MainchainError> {
        Ok(221)
    }
}

fn keys_paths(dir: &Path) -> (ProofKeysPaths, ProofKeysPaths) {
    (
        ProofKeysPaths::for_certificate(dir),
        ProofKeysPaths::for_csw(dir, 900),
    )
}

#[tokio::test]
async fn nonzero_exit_surfaces_command_and_stderr() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());

    let result: Result<serde_json::Value, _> = tool.invoke("fail", &serde_json::json!({})).await;
    match result {
        Err(BridgeError::ToolFailed { command, exit_code, stderr }) => {
            assert_eq!(command, "fail");
            assert_eq!(exit_code, Some(3));
            assert!(stderr.contains("kaput"));
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_output_keeps_the_full_diagnostic() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());

    let result: Result<serde_json::Value, _> =
        tool.invoke("boom", &serde_json::json!({"seed": "x"})).await;
    match result {
        Err(BridgeError::MalformedOutput { command, params, output }) => {
            assert_eq!(command, "boom");
            assert!(params.contains("seed"));
            assert!(output.contains("this is not json"));
        }
        other => panic!("expected MalformedOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn key_batches_use_suffixed_seeds() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());

    let accounts = generate_secrets(&tool, "alpha", 3).await.unwrap();
    assert_eq!(accounts.len(), 3);

    let calls = tool_calls(dir.path());
    assert_eq!(calls.len(), 3);
    for (i, call) in calls.iter().enumerate() {
        assert!(call.starts_with("generatekey "));
        assert!(call.contains(&format!("alpha_{}", i + 1)), "call: {call}");
    }
}

#[tokio::test]
async fn replacement_signer_keys_come_as_full_pairs() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());

    let keys = generate_cert_signer_secrets(&tool, "rotation", 2).await.unwrap();
    assert_eq!(keys.len(), 2);
    for key in &keys {
        assert!(!key.secret.is_empty());
        assert!(!key.public_key.is_empty());
    }
    assert!(tool_calls(dir.path())
        .iter()
        .all(|c| c.starts_with("generateCertSignerKey ")));
}

#[tokio::test]
async fn certificate_proof_descriptor_is_structurally_sound() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());
    let (cert_paths, _) = keys_paths(dir.path());

    let info = generate_certificate_proof_info(
        &tool,
        "seed",
        7,
        5,
        CertificateCircuitType::NaiveThresholdSignature,
        &cert_paths,
    )
    .await
    .unwrap();

    assert_eq!(info.max_keys(), 7);
    assert_eq!(info.threshold, 5);
    assert_eq!(info.signer_secrets[0], "ssk1");
    assert_eq!(info.signer_public_keys[6], "spk7");
    assert!(info.master_secrets.is_empty());
    info.validate(7).unwrap();
}

#[tokio::test]
async fn full_sequence_assembles_the_descriptor() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());
    let mainchain = RecordingMainchain::new();
    let (cert_paths, csw_paths) = keys_paths(dir.path());

    let creation = SidechainCreationInfo::default();
    let assembler = GenesisAssembler::new(&tool, &mainchain);
    let info = assembler
        .create_sidechain(&creation, None, cert_paths.clone(), csw_paths)
        .await
        .unwrap();

    assert_eq!(info.sidechain_id, "sc-2f7a");
    assert_eq!(info.genesis_account_balance, 100);
    assert_eq!(info.mainchain_block_height, 221);
    assert_eq!(info.network, "regtest");
    assert_eq!(info.withdrawal_epoch_length, 900);
    assert_eq!(info.genesis_block_hex, "beef");
    assert_eq!(info.genesis_vrf_account.public_key, "vpk");
    assert_eq!(info.certificate_proof_info.max_keys(), 7);
    assert_eq!(info.cert_keys_paths, cert_paths);
    assert_eq!(
        info.csw_proof_info,
        CswProofInfo::Enabled { verification_key: "cswvk".into() }
    );

    let account = info.genesis_account.as_ref().unwrap();
    assert_eq!(account.secret, "gsk");
    assert!(info.redacted().genesis_account.is_none());

    // Creation request embeds the generated public keys and the csw key.
    let requests = mainchain.creation_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("\"toAddress\":\"gpk\""));
    assert!(requests[0].contains("\"vrfPublicKey\":\"vpk\""));
    assert!(requests[0].contains("\"cswVerificationKey\":\"cswvk\""));

    // The genesis payload is parsed with the default timestamp rewind.
    let genesis_call = tool_calls(dir.path())
        .into_iter()
        .find(|c| c.starts_with("genesisinfo "))
        .unwrap();
    assert!(genesis_call
        .contains(&format!("\"regtestBlockTimestampRewind\":{DEFAULT_BLOCK_TIMESTAMP_REWIND}")));
}

#[tokio::test]
async fn non_ceasing_sidechain_skips_csw_and_declares_epoch_zero() {
    let dir = TempDir::new().unwrap();
    let tool = fake_tool(dir.path());
    let mainchain = RecordingMainchain::new();
    let (cert_paths, csw_paths) = keys_paths(dir.path());

    let creation = SidechainCreationInfo {
        is_non_ceasing: true,
        creation_version: ScCreationVersion::V2,
        csw_enabled: false,
        ..Default::default()
    };
    let assembler = GenesisAssembler::new(&tool, &mainchain).with_seed("nonceasing");
    let info = assembler
        .create_sidechain(&creation, Some(0), cert_paths, csw_paths)
        .await
        .unwrap();

    assert_eq!(info.csw_proof_info, CswProofInfo::Disabled);
    assert!(!tool_calls(dir.path())
        .iter()
        .any(|c| c.starts_with("generateCswProofInfo")));

    let requests = mainchain.creation_requests.lock().unwrap();
    assert!(requests[0].contains("\"version\":2"));
    assert!(requests[0].contains("\"withdrawalEpochLength\":0"));
    assert!(!requests[0].contains("cswVerificationKey"));
}

#[tokio::test]
async fn step_failures_name_the_failing_step() {
    let dir = TempDir::new().unwrap();
    // A tool that dies on every command makes the first step fail.
    let script = dir.path().join("broken-tool.sh");
    fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    let tool = BootstrapTool::new(PathBuf::from(&script));
    let mainchain = RecordingMainchain::new();
    let (cert_paths, csw_paths) = keys_paths(dir.path());

    let err = GenesisAssembler::new(&tool, &mainchain)
        .create_sidechain(&SidechainCreationInfo::default(), None, cert_paths, csw_paths)
        .await
        .unwrap_err();
    assert_eq!(err.step, "generate genesis account");
}
