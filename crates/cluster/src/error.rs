//! Cluster-level error taxonomy.

use thiserror::Error;

/// Failures while running or wiring a test network.
///
/// Timeouts are recoverable by retrying with a larger bound; everything
/// else indicates a broken network and propagates to the test runner.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The sidechain bootstrap sequence failed.
    #[error(transparent)]
    Bootstrap(#[from] sidenet_bootstrap::BootstrapError),

    /// Invalid sidechain or node parameters, caught before any spawn.
    #[error(transparent)]
    Configuration(#[from] sidenet_types::ConfigurationError),

    /// A configuration template failed to render.
    #[error(transparent)]
    Render(#[from] crate::render::RenderError),

    /// A convergence primitive failed or timed out.
    #[error(transparent)]
    Sync(#[from] crate::sync::SyncError),

    /// A node control-API call failed.
    #[error(transparent)]
    Api(#[from] crate::client::ApiError),

    /// `start` was called for an index that already has a live process.
    #[error("node {index} is already registered as running")]
    AlreadyRunning {
        /// Node index within the sidechain.
        index: usize,
    },

    /// A node process exited when it was expected to be running.
    #[error("node {index} is not alive (exit code {exit_code:?})")]
    Liveness {
        /// Node index within the sidechain.
        index: usize,
        /// Exit code, if the child was not killed by a signal.
        exit_code: Option<i32>,
    },

    /// Topology wiring could not be confirmed.
    #[error("connecting node {from} to node {to} failed: {detail}")]
    Topology {
        /// Dialing node index.
        from: usize,
        /// Dialed node index.
        to: usize,
        /// What went wrong.
        detail: String,
    },

    /// A bounded wait elapsed.
    #[error("timed out while {operation}")]
    Timeout {
        /// Human-readable operation name.
        operation: &'static str,
    },

    /// A sibling launch failed, so this launch was cancelled.
    #[error("launch cancelled after a sibling launch failure")]
    Cancelled,

    /// A launch task panicked or was aborted.
    #[error("launch task failed: {0}")]
    Task(String),

    /// Filesystem or process-spawn failure.
    #[error("i/o failure while {context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ClusterError {
    /// Attach a context string to a raw I/O error.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }
}
