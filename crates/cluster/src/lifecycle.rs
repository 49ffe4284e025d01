//! Node process lifecycle: spawn, supervise, stop.
//!
//! Per node the lifecycle is NotStarted, Starting (inside [`NodeManager::start`]),
//! Running, Stopping (inside [`NodeManager::stop`]) and Stopped, with Crashed
//! reachable from Running when the child exits on its own. The transient
//! phases never escape their method; [`NodeStatus`] reports the rest.

use crate::client::PeerControl;
use crate::error::ClusterError;
use crate::registry::ProcessRegistry;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const PORT_WAIT_BACKOFF: Duration = Duration::from_secs(1);

/// Observable state of one node process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// No process was ever registered for this index.
    NotStarted,
    /// The child is alive.
    Running,
    /// The child exited without being asked to.
    Crashed {
        /// Exit code, if not killed by a signal.
        exit_code: Option<i32>,
    },
    /// The child was stopped through [`NodeManager::stop`].
    Stopped,
}

/// Everything needed to launch one node process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Node executable.
    pub binary: PathBuf,
    /// Rendered configuration file, passed as the first argument.
    pub config_path: PathBuf,
    /// Additional command-line arguments.
    pub extra_args: Vec<String>,
    /// CPU core to pin the process to, for throughput test variants.
    pub cpu_pin: Option<usize>,
    /// Redirect the child's stdout and stderr to this file.
    pub log_file: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(binary: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config_path: config_path.into(),
            extra_args: Vec::new(),
            cpu_pin: None,
            log_file: None,
        }
    }
}

/// Spawns and supervises the node processes of one test network.
#[derive(Debug, Default)]
pub struct NodeManager {
    registry: ProcessRegistry,
    stopped: Mutex<HashSet<usize>>,
}

impl NodeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying process registry.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    fn build_command(spec: &LaunchSpec) -> Result<Command, ClusterError> {
        // CPU pinning is a Linux-only hint; elsewhere the field is
        // silently ignored.
        let mut command = match spec.cpu_pin {
            Some(core) if cfg!(target_os = "linux") => {
                let mut c = Command::new("taskset");
                c.arg("-c").arg(core.to_string()).arg(&spec.binary);
                c
            }
            _ => Command::new(&spec.binary),
        };
        command.arg(&spec.config_path).args(&spec.extra_args).stdin(Stdio::null());

        match &spec.log_file {
            Some(path) => {
                let out = std::fs::File::create(path).map_err(|e| {
                    ClusterError::io(format!("creating node log file {}", path.display()), e)
                })?;
                let err = out.try_clone().map_err(|e| {
                    ClusterError::io(format!("creating node log file {}", path.display()), e)
                })?;
                command.stdout(out).stderr(err);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        command.kill_on_drop(true);
        Ok(command)
    }

    /// Launch a node and block until its RPC port accepts a connection.
    ///
    /// The port wait retries with a fixed backoff and has no upper bound of
    /// its own; callers running under CI use [`NodeManager::start_with_timeout`].
    /// A child that exits during the wait surfaces as
    /// [`ClusterError::Liveness`] instead of hanging forever.
    pub async fn start(
        &self,
        index: usize,
        spec: &LaunchSpec,
        rpc_port: u16,
    ) -> Result<(), ClusterError> {
        if self.registry.contains(index) {
            return Err(ClusterError::AlreadyRunning { index });
        }

        let child = Self::build_command(spec)?
            .spawn()
            .map_err(|e| ClusterError::io(format!("spawning node {index}"), e))?;
        debug!(index, pid = ?child.id(), binary = %spec.binary.display(), "node spawned");
        self.registry.register(index, child);
        self.stopped.lock().remove(&index);

        loop {
            if TcpStream::connect(("127.0.0.1", rpc_port)).await.is_ok() {
                info!(index, rpc_port, "node is up");
                return Ok(());
            }
            if let NodeStatus::Crashed { exit_code } = self.status(index) {
                self.registry.take(index);
                return Err(ClusterError::Liveness { index, exit_code });
            }
            sleep(PORT_WAIT_BACKOFF).await;
        }
    }

    /// [`NodeManager::start`] bounded by `bound`; the child is killed if the
    /// port never comes up in time.
    pub async fn start_with_timeout(
        &self,
        index: usize,
        spec: &LaunchSpec,
        rpc_port: u16,
        bound: Duration,
    ) -> Result<(), ClusterError> {
        match timeout(bound, self.start(index, spec, rpc_port)).await {
            Ok(result) => result,
            Err(_) => {
                if let Some(mut child) = self.registry.take(index) {
                    let _ = child.kill().await;
                }
                Err(ClusterError::Timeout { operation: "waiting for the node rpc port" })
            }
        }
    }

    /// Current state of the node at `index`.
    pub fn status(&self, index: usize) -> NodeStatus {
        let polled = self
            .registry
            .with_child(index, |child| child.try_wait().ok().flatten());
        match polled {
            Some(Some(status)) => NodeStatus::Crashed { exit_code: status.code() },
            Some(None) => NodeStatus::Running,
            None if self.stopped.lock().contains(&index) => NodeStatus::Stopped,
            None => NodeStatus::NotStarted,
        }
    }

    pub fn is_running(&self, index: usize) -> bool {
        matches!(self.status(index), NodeStatus::Running)
    }

    /// Stop the node at `index`.
    ///
    /// Asks the node to shut itself down over its control API when one is
    /// given, then falls back to killing the child if the API call fails or
    /// the process outlives `grace`. Idempotent: an unknown or
    /// already-stopped index is a no-op.
    pub async fn stop(
        &self,
        index: usize,
        control: Option<&dyn PeerControl>,
        grace: Duration,
    ) -> Result<(), ClusterError> {
        let Some(mut child) = self.registry.take(index) else {
            return Ok(());
        };

        let asked = match control {
            Some(api) => match api.stop().await {
                Ok(()) => true,
                Err(error) => {
                    warn!(index, %error, "stop api call failed, killing the process");
                    false
                }
            },
            None => false,
        };

        if asked {
            match timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(index, ?status, "node stopped gracefully");
                    self.stopped.lock().insert(index);
                    return Ok(());
                }
                Ok(Err(error)) => warn!(index, %error, "waiting for node exit failed"),
                Err(_) => warn!(index, "node ignored its stop command"),
            }
        }

        match child.kill().await {
            Ok(()) => {}
            // A child that already exited cannot be killed again, which is
            // the outcome we wanted anyway.
            Err(_) if matches!(child.try_wait(), Ok(Some(_))) => {}
            Err(source) => {
                return Err(ClusterError::io(format!("killing node {index}"), source))
            }
        }
        self.stopped.lock().insert(index);
        Ok(())
    }

    /// Kill every registered node, best effort. Used at teardown.
    pub async fn kill_all(&self) {
        for (index, mut child) in self.registry.drain() {
            if let Err(error) = child.kill().await {
                warn!(index, %error, "failed to kill node during teardown");
            }
            self.stopped.lock().insert(index);
        }
    }
}

/// Launches the nodes of one sidechain concurrently.
///
/// Each launch runs as its own task under a [`TaskTracker`]; the first
/// failure cancels the launches still waiting for their port. `join`
/// returns the first failure after every task has settled, so no spawn is
/// left untracked.
pub struct LaunchPool {
    manager: Arc<NodeManager>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<Result<usize, (usize, ClusterError)>>>,
}

impl LaunchPool {
    pub fn new(manager: Arc<NodeManager>) -> Self {
        Self {
            manager,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Queue one node launch.
    pub fn launch(&mut self, index: usize, spec: LaunchSpec, rpc_port: u16, bound: Duration) {
        let manager = Arc::clone(&self.manager);
        let cancel = self.cancel.clone();
        let handle = self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => Err((index, ClusterError::Cancelled)),
                result = manager.start_with_timeout(index, &spec, rpc_port, bound) => {
                    result.map(|_| index).map_err(|e| (index, e))
                }
            }
        });
        self.handles.push(handle);
    }

    /// Wait for every queued launch; returns the first real failure.
    pub async fn join(mut self) -> Result<(), ClusterError> {
        self.tracker.close();
        let mut first_failure: Option<ClusterError> = None;
        for handle in self.handles.drain(..) {
            match handle.await {
                Ok(Ok(index)) => debug!(index, "launch complete"),
                Ok(Err((index, error))) => {
                    warn!(index, %error, "launch failed");
                    self.cancel.cancel();
                    if !matches!(error, ClusterError::Cancelled) || first_failure.is_none() {
                        first_failure.get_or_insert(error);
                    }
                }
                Err(join_error) => {
                    self.cancel.cancel();
                    first_failure.get_or_insert(ClusterError::Task(join_error.to_string()));
                }
            }
        }
        self.tracker.wait().await;
        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stopping_an_unknown_index_is_a_noop() {
        let manager = NodeManager::new();
        manager.stop(7, None, Duration::from_millis(100)).await.unwrap();
        assert_eq!(manager.status(7), NodeStatus::NotStarted);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_clears_the_registry() {
        let manager = NodeManager::new();
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        manager.registry().register(0, child);
        assert!(manager.is_running(0));

        manager.stop(0, None, Duration::from_millis(100)).await.unwrap();
        assert_eq!(manager.status(0), NodeStatus::Stopped);
        assert!(!manager.registry().contains(0));

        // Second stop finds nothing and succeeds.
        manager.stop(0, None, Duration::from_millis(100)).await.unwrap();
        assert_eq!(manager.status(0), NodeStatus::Stopped);
    }

    #[tokio::test]
    async fn crashed_child_reports_its_exit_code() {
        let manager = NodeManager::new();
        let child = Command::new("false").spawn().unwrap();
        manager.registry().register(2, child);

        // Give the child a moment to exit.
        for _ in 0..50 {
            if !manager.is_running(2) {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(manager.status(2), NodeStatus::Crashed { exit_code: Some(1) });
    }
}
