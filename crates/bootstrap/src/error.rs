//! Bootstrap error types.

use sidenet_types::ProofError;
use thiserror::Error;

/// Failures of the external bootstrap tool bridge.
///
/// The bridge is the only channel through which key and proof material
/// enters the system, so these errors always carry the full diagnostic:
/// command name, serialized parameters, and the raw tool output. Nothing is
/// swallowed.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The tool's location was not configured.
    #[error("bootstrap tool not configured: set {} to the tool executable", crate::SIDENET_TOOL_ENV)]
    ToolNotConfigured,

    /// The tool process could not be spawned or awaited.
    #[error("failed to run bootstrap tool command `{command}`: {source}")]
    Io {
        /// Tool command that was being invoked.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status.
    #[error("bootstrap tool command `{command}` exited with {exit_code:?}: {stderr}")]
    ToolFailed {
        /// Tool command that was being invoked.
        command: String,
        /// Process exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The tool's standard output was not parseable.
    #[error(
        "bootstrap tool command `{command}` produced unparseable output\nparams: {params}\noutput: {output}"
    )]
    MalformedOutput {
        /// Tool command that was being invoked.
        command: String,
        /// Serialized parameters passed to the tool.
        params: String,
        /// Raw, unparsed standard output.
        output: String,
    },
}

/// Cause of a failed bootstrap step.
#[derive(Debug, Error)]
pub enum StepError {
    /// The bootstrap tool bridge failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// A mainchain RPC call failed.
    #[error(transparent)]
    Mainchain(#[from] crate::mainchain::MainchainError),
    /// The tool returned a structurally inconsistent proof descriptor.
    #[error(transparent)]
    Proof(#[from] ProofError),
}

impl From<crate::proof::ProofBuildError> for StepError {
    fn from(err: crate::proof::ProofBuildError) -> Self {
        match err {
            crate::proof::ProofBuildError::Bridge(e) => StepError::Bridge(e),
            crate::proof::ProofBuildError::Descriptor(e) => StepError::Proof(e),
        }
    }
}

/// A sidechain bootstrap failure.
///
/// Fatal to the whole sidechain: no partial state survives that a retry
/// could resume from, so callers must restart the full creation sequence.
#[derive(Debug, Error)]
#[error("sidechain bootstrap failed at step `{step}`: {source}")]
pub struct BootstrapError {
    /// Name of the failing bootstrap step.
    pub step: &'static str,
    /// Underlying failure.
    #[source]
    pub source: StepError,
}

impl BootstrapError {
    /// Wrap a step failure with the name of the step that produced it.
    pub fn at(step: &'static str, source: impl Into<StepError>) -> Self {
        Self { step, source: source.into() }
    }
}
