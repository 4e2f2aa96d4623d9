//! The Sandbox Executor's `Run(spec) -> ExecResult` contract (§4.1).

use std::collections::BTreeMap;
use std::time::Duration;

/// Everything needed to launch one confined, one-shot container.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    pub image: String,
    pub entrypoint: Vec<String>,
    pub stdin: Vec<u8>,
    pub env: BTreeMap<String, String>,
    pub cpu_nanocores: u64,
    pub memory_bytes: u64,
    pub read_only_filesystem: bool,
    pub run_as_non_root: bool,
    pub dropped_capabilities: Vec<String>,
    pub no_new_privileges: bool,
    pub network: NetworkAttachment,
    pub deadline: Duration,
    pub container_name: String,
}

/// The resolved network attachment for a single run, after a manifest's
/// `security.network` has been turned into something a runtime CLI
/// understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAttachment {
    None,
    Bridge(String),
}

/// The outcome of one container run (§4.1 "Result").
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub ok: bool,
    pub output: Option<serde_json::Value>,
    pub error: Option<ExecError>,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub cpu_ms: Option<u64>,
    pub memory_peak_bytes: Option<u64>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

/// A structured failure reason distinct from `crucible_error::Error` so the
/// caller (the Retry Controller) decides retryability using the same
/// `retryable` flag the tool itself reported, when there was one.
#[derive(Debug, Clone)]
pub struct ExecError {
    pub message: String,
    pub retryable: bool,
}
