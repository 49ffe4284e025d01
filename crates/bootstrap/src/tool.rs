//! Bridge to the external key/proof-generation tool.
//!
//! Invocation protocol: `tool <command> <json-params>`; the tool writes
//! exactly one JSON object to standard output and exits. A non-zero exit or
//! unparseable output is a hard bootstrap failure.

use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment variable locating the bootstrap tool executable.
pub const SIDENET_TOOL_ENV: &str = "SIDENET_TOOL";

/// Handle to the external bootstrapping executable.
///
/// This is the only channel through which cryptographic key and proof
/// material enters the orchestrator.
#[derive(Debug, Clone)]
pub struct BootstrapTool {
    program: PathBuf,
}

impl BootstrapTool {
    /// Use an explicit tool executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Locate the tool through [`SIDENET_TOOL_ENV`].
    pub fn from_env() -> Result<Self, BridgeError> {
        match std::env::var_os(SIDENET_TOOL_ENV) {
            Some(path) if !path.is_empty() => Ok(Self::new(PathBuf::from(path))),
            _ => Err(BridgeError::ToolNotConfigured),
        }
    }

    /// Path of the tool executable.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Run one tool command and parse its standard output as JSON.
    ///
    /// The parameter object is serialized to a single JSON argument. On
    /// parse failure the returned error carries the command, the serialized
    /// parameters, and the raw output, so the diagnostic is never lost.
    pub async fn invoke<T, P>(&self, command: &str, params: &P) -> Result<T, BridgeError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let json_params = serde_json::to_string(params).map_err(|e| BridgeError::Io {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        debug!(command, params = %json_params, tool = %self.program.display(), "invoking bootstrap tool");

        let output = Command::new(&self.program)
            .arg(command)
            .arg(&json_params)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BridgeError::Io { command: command.to_string(), source })?;

        if !output.status.success() {
            return Err(BridgeError::ToolFailed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|_| BridgeError::MalformedOutput {
            command: command.to_string(),
            params: json_params,
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
