//! The `ContainerRuntime` abstraction and the container-run algorithm that
//! drives it (§4.1 steps 1-8).
//!
//! Grounded on the CLI-wrapper-around-an-external-binary pattern: a small
//! trait of primitive operations, a production implementation that shells
//! out to the `docker`/`podman` CLI, and a `Send + Sync` object-safe
//! abstraction so the orchestrator and its tests never depend on which one
//! is in use.

use crate::envelope::parse_envelope;
use crate::spec::{ExecError, ExecResult, ExecSpec};
use async_trait::async_trait;
use crucible_error::Error;
use std::time::Duration;
use tracing::{info, warn};

/// How a container's wait primitive resolved.
#[derive(Debug, Clone, Copy)]
pub enum WaitOutcome {
    Exited(i32),
    TimedOut,
}

/// Best-effort resource usage collected after the container stops.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub cpu_ms: u64,
    pub memory_peak_bytes: u64,
}

/// The primitive container lifecycle operations the Sandbox Executor needs.
///
/// Every method that can fail for reasons outside the tool's control
/// (image pull, container create/start) returns a `crucible_error::Error`
/// that the caller marks retryable, per §4.1's failure model.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ensure `image` is present locally, pulling it if not (§4.1 step 1).
    async fn ensure_image(&self, image: &str) -> Result<(), Error>;

    /// Create (but do not start) a container from `spec`, returning its id
    /// (§4.1 step 2).
    async fn create(&self, spec: &ExecSpec) -> Result<String, Error>;

    /// Write `spec.stdin` to the container, close stdin, and start it
    /// (§4.1 step 3).
    async fn start(&self, container_id: &str, stdin: &[u8]) -> Result<(), Error>;

    /// Block until the container exits or `deadline` elapses (§4.1 step 4).
    async fn wait(&self, container_id: &str, deadline: Duration) -> Result<WaitOutcome, Error>;

    /// Send a kill signal (§4.1 step 5, the deadline path).
    async fn kill(&self, container_id: &str) -> Result<(), Error>;

    /// Collect stdout and stderr (§4.1 step 6).
    async fn logs(&self, container_id: &str) -> Result<(Vec<u8>, Vec<u8>), Error>;

    /// Best-effort resource stats; `None` on any failure (§4.1 step 7).
    async fn stats(&self, container_id: &str) -> Option<Stats>;

    /// Remove the container. Failures are logged, never surfaced (§4.1
    /// step 8).
    async fn remove(&self, container_id: &str);
}

/// Run one invocation end to end against any `ContainerRuntime`,
/// implementing the full §4.1 algorithm including its tie-break rules.
pub async fn run(runtime: &dyn ContainerRuntime, spec: &ExecSpec) -> ExecResult {
    let started = std::time::Instant::now();

    if let Err(err) = runtime.ensure_image(&spec.image).await {
        return infra_failure(err, started.elapsed());
    }

    let container_id = match runtime.create(spec).await {
        Ok(id) => id,
        Err(err) => return infra_failure(err, started.elapsed()),
    };

    if let Err(err) = runtime.start(&container_id, &spec.stdin).await {
        runtime.remove(&container_id).await;
        return infra_failure(err, started.elapsed());
    }

    let outcome = match runtime.wait(&container_id, spec.deadline).await {
        Ok(outcome) => outcome,
        Err(err) => {
            runtime.remove(&container_id).await;
            return infra_failure(err, started.elapsed());
        }
    };

    let (exit_code, timed_out) = match outcome {
        WaitOutcome::Exited(code) => (Some(code), false),
        WaitOutcome::TimedOut => {
            if let Err(err) = runtime.kill(&container_id).await {
                warn!(container_id, error = %err, "failed to kill timed-out container");
            }
            (None, true)
        }
    };

    let (stdout, stderr) = runtime.logs(&container_id).await.unwrap_or_default();
    let stats = runtime.stats(&container_id).await;
    runtime.remove(&container_id).await;

    let duration = started.elapsed();

    if timed_out {
        info!(container_id, "container timed out and was killed");
        return ExecResult {
            ok: false,
            output: None,
            error: Some(ExecError {
                message: "execution deadline exceeded".to_string(),
                retryable: true,
            }),
            exit_code,
            duration,
            cpu_ms: stats.map(|s| s.cpu_ms),
            memory_peak_bytes: stats.map(|s| s.memory_peak_bytes),
            stdout,
            stderr,
            timed_out: true,
        };
    }

    classify_exit(exit_code, stdout, stderr, duration, stats)
}

fn classify_exit(
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    duration: Duration,
    stats: Option<Stats>,
) -> ExecResult {
    let envelope = parse_envelope(&stdout);
    let code = exit_code.unwrap_or(-1);

    let (ok, output, error) = match (code, envelope) {
        (0, Ok(env)) if env.ok => (true, env.output, None),
        (0, Ok(env)) => (
            false,
            None,
            Some(ExecError {
                message: env
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "tool reported failure with no error detail".to_string()),
                retryable: env.error.map(|e| e.retryable).unwrap_or(false),
            }),
        ),
        (0, Err(_)) => (
            false,
            None,
            Some(ExecError { message: "malformed tool output".to_string(), retryable: false }),
        ),
        (_, Ok(env)) if !env.ok => (
            false,
            None,
            Some(ExecError {
                message: env
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "tool reported failure".to_string()),
                retryable: env.error.map(|e| e.retryable).unwrap_or(false),
            }),
        ),
        (_, _) => (
            false,
            None,
            Some(ExecError {
                message: format!("container exited with code {code} and no tool envelope"),
                retryable: false,
            }),
        ),
    };

    ExecResult {
        ok,
        output,
        error,
        exit_code,
        duration,
        cpu_ms: stats.map(|s| s.cpu_ms),
        memory_peak_bytes: stats.map(|s| s.memory_peak_bytes),
        stdout,
        stderr,
        timed_out: false,
    }
}

fn infra_failure(err: Error, duration: Duration) -> ExecResult {
    ExecResult {
        ok: false,
        output: None,
        error: Some(ExecError { message: err.to_string(), retryable: err.is_retryable() }),
        exit_code: None,
        duration,
        cpu_ms: None,
        memory_peak_bytes: None,
        stdout: Vec::new(),
        stderr: Vec::new(),
        timed_out: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeContainerRuntime;
    use crate::spec::NetworkAttachment;
    use std::collections::BTreeMap;

    fn sample_spec() -> ExecSpec {
        ExecSpec {
            image: "registry.example/tool:1.0.0".to_string(),
            entrypoint: vec!["/app/run".to_string()],
            stdin: br#"{"input":{}}"#.to_vec(),
            env: BTreeMap::new(),
            cpu_nanocores: 500_000_000,
            memory_bytes: 512 * 1024 * 1024,
            read_only_filesystem: true,
            run_as_non_root: true,
            dropped_capabilities: vec!["ALL".to_string()],
            no_new_privileges: true,
            network: NetworkAttachment::None,
            deadline: Duration::from_secs(5),
            container_name: "crucible-tool-test".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_envelope_is_ok() {
        let runtime = FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{"x":1}}"#.to_vec());
        let result = run(&runtime, &sample_spec()).await;
        assert!(result.ok);
        assert_eq!(result.output.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn zero_exit_with_malformed_stdout_is_fatal() {
        let runtime = FakeContainerRuntime::succeeding(b"not json".to_vec());
        let result = run(&runtime, &sample_spec()).await;
        assert!(!result.ok);
        assert!(!result.error.unwrap().retryable);
    }

    #[tokio::test]
    async fn nonzero_exit_with_envelope_uses_its_retryable_flag() {
        let runtime = FakeContainerRuntime::exiting(
            1,
            br#"{"ok":false,"error":{"type":"x","message":"boom","retryable":true}}"#.to_vec(),
        );
        let result = run(&runtime, &sample_spec()).await;
        assert!(!result.ok);
        assert!(result.error.unwrap().retryable);
    }

    #[tokio::test]
    async fn nonzero_exit_with_no_envelope_is_fatal() {
        let runtime = FakeContainerRuntime::exiting(137, Vec::new());
        let result = run(&runtime, &sample_spec()).await;
        assert!(!result.ok);
        assert!(!result.error.unwrap().retryable);
    }

    #[tokio::test]
    async fn timeout_is_retryable() {
        let runtime = FakeContainerRuntime::timing_out();
        let result = run(&runtime, &sample_spec()).await;
        assert!(result.timed_out);
        assert!(result.error.unwrap().retryable);
    }

    #[tokio::test]
    async fn image_pull_failure_is_retryable() {
        let runtime = FakeContainerRuntime::failing_pull();
        let result = run(&runtime, &sample_spec()).await;
        assert!(!result.ok);
        assert!(result.error.unwrap().retryable);
    }

    #[tokio::test]
    async fn stats_unavailability_degrades_gracefully() {
        let runtime = FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{}}"#.to_vec())
            .without_stats();
        let result = run(&runtime, &sample_spec()).await;
        assert!(result.ok);
        assert!(result.cpu_ms.is_none());
        assert!(result.memory_peak_bytes.is_none());
    }
}
