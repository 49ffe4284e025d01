//! Test-runner options surface and tracing setup.
//!
//! The runner binary itself lives with the test suites; this module only
//! provides the typed option set they all share, so every suite parses
//! and validates flags the same way.

use clap::Parser;
use sidenet_types::{LogLevel, SidechainOptions, DEFAULT_REST_API_TIMEOUT_SECS};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Per-sidechain option overrides, keyed by sidechain index.
pub type SidechainOptionsMap = HashMap<usize, SidechainOptions>;

/// A `[sidechain_index, node_index]` pair naming the node to run under a
/// debugger (its launch skips the port-liveness wait bound).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugTarget {
    pub sidechain: usize,
    pub node: usize,
}

impl FromStr for DebugTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let mut parts = inner.split(',').map(str::trim);
        let sidechain = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("expected [sidechain,node], got `{s}`"))?
            .parse::<usize>()
            .map_err(|e| format!("bad sidechain index in `{s}`: {e}"))?;
        let node = parts
            .next()
            .ok_or_else(|| format!("expected [sidechain,node], got `{s}`"))?
            .parse::<usize>()
            .map_err(|e| format!("bad node index in `{s}`: {e}"))?;
        if parts.next().is_some() {
            return Err(format!("expected exactly two indices, got `{s}`"));
        }
        Ok(Self { sidechain, node })
    }
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown log level `{s}`"))
}

fn parse_sidechain_options(s: &str) -> Result<SidechainOptionsMap, String> {
    let raw: HashMap<String, SidechainOptions> =
        serde_json::from_str(s).map_err(|e| format!("bad sidechain options map: {e}"))?;
    raw.into_iter()
        .map(|(key, value)| {
            key.parse::<usize>()
                .map(|index| (index, value))
                .map_err(|e| format!("bad sidechain index `{key}`: {e}"))
        })
        .collect()
}

/// Options shared by every sidenet test runner.
#[derive(Debug, Clone, Parser)]
#[command(name = "sidenet", about = "multi-sidechain test network runner")]
pub struct RunnerOptions {
    /// Sidechain node executable.
    #[arg(long, env = "SIDENET_NODE_BIN")]
    pub node_binary: PathBuf,

    /// Mainchain node JSON-RPC url.
    #[arg(long, default_value = "http://127.0.0.1:8332")]
    pub mainchain_url: String,

    /// Root directory for node data directories; the unit of cleanup.
    /// Defaults to a fresh temporary directory.
    #[arg(long)]
    pub tmpdir: Option<PathBuf>,

    /// REST control-API timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REST_API_TIMEOUT_SECS)]
    pub rest_timeout_secs: u64,

    /// Log level for per-node log files.
    #[arg(long, default_value = "all", value_parser = parse_log_level)]
    pub logfilelevel: LogLevel,

    /// Log level for node console output.
    #[arg(long, default_value = "error", value_parser = parse_log_level)]
    pub logconsolelevel: LogLevel,

    /// Node to attach a debugger to, as `[sidechain_index,node_index]`.
    #[arg(long = "debugnode")]
    pub debug_target: Option<DebugTarget>,

    /// Per-sidechain option overrides as a JSON map, e.g.
    /// `{"0": {"nonceasing": true}}`.
    #[arg(long = "sidechain-opts", default_value = "{}", value_parser = parse_sidechain_options)]
    pub sidechain_opts: SidechainOptionsMap,

    /// Parallel group of this run; shifts the whole port namespace.
    #[arg(long, default_value_t = 0)]
    pub parallel: u16,

    /// Leave node data directories in place after the run.
    #[arg(long)]
    pub nocleanup: bool,

    /// Leave the nodes running after the run.
    #[arg(long)]
    pub noshutdown: bool,
}

impl RunnerOptions {
    /// Options for the sidechain at `index`; defaults when none were given.
    pub fn options_for(&self, index: usize) -> SidechainOptions {
        self.sidechain_opts.get(&index).cloned().unwrap_or_default()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the given default directive.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidenet_types::CertificateCircuitType;

    fn parse(args: &[&str]) -> RunnerOptions {
        let mut argv = vec!["sidenet", "--node-binary", "/usr/bin/true"];
        argv.extend_from_slice(args);
        RunnerOptions::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_sensible() {
        let options = parse(&[]);
        assert_eq!(options.parallel, 0);
        assert_eq!(options.rest_timeout_secs, DEFAULT_REST_API_TIMEOUT_SECS);
        assert_eq!(options.logfilelevel, LogLevel::All);
        assert_eq!(options.logconsolelevel, LogLevel::Error);
        assert!(options.debug_target.is_none());
        assert!(options.sidechain_opts.is_empty());
        assert!(!options.nocleanup);
    }

    #[test]
    fn debug_target_parses_bracketed_pair() {
        let options = parse(&["--debugnode", "[1,2]"]);
        assert_eq!(options.debug_target, Some(DebugTarget { sidechain: 1, node: 2 }));
        assert_eq!("0 , 3".parse::<DebugTarget>().unwrap(), DebugTarget { sidechain: 0, node: 3 });
        assert!("[1]".parse::<DebugTarget>().is_err());
        assert!("[1,2,3]".parse::<DebugTarget>().is_err());
    }

    #[test]
    fn sidechain_options_map_is_typed_and_validated() {
        let options = parse(&[
            "--sidechain-opts",
            r#"{"1": {"nonceasing": true, "certcircuittype": "NaiveThresholdSignatureCircuitWithKeyRotation"}}"#,
        ]);
        let opts = options.options_for(1);
        assert!(opts.nonceasing);
        assert_eq!(
            opts.certcircuittype,
            Some(CertificateCircuitType::NaiveThresholdSignatureWithKeyRotation)
        );
        assert_eq!(options.options_for(0), SidechainOptions::default());
    }

    #[test]
    fn unknown_sidechain_option_keys_are_rejected_at_parse_time() {
        let argv = vec![
            "sidenet",
            "--node-binary",
            "/usr/bin/true",
            "--sidechain-opts",
            r#"{"0": {"noncesing": true}}"#,
        ];
        assert!(RunnerOptions::try_parse_from(argv).is_err());
    }
}
