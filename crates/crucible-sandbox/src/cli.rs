//! Production `ContainerRuntime`: shells out to a `docker`-compatible CLI
//! rather than linking a daemon SDK (no such crate appears anywhere in the
//! corpus this workspace was grounded on).

use crate::runtime::{ContainerRuntime, Stats, WaitOutcome};
use crate::spec::{ExecSpec, NetworkAttachment};
use async_trait::async_trait;
use crucible_error::Error;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Invokes a container CLI (`docker` or `podman`) as a subprocess.
pub struct CliContainerRuntime {
    binary: String,
}

impl CliContainerRuntime {
    /// `binary` is typically `"docker"` or `"podman"`.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    fn confinement_args(spec: &ExecSpec) -> Vec<String> {
        let mut args = vec![
            "--name".to_string(),
            spec.container_name.clone(),
            format!("--memory={}", spec.memory_bytes),
            format!("--cpus={:.3}", spec.cpu_nanocores as f64 / 1_000_000_000.0),
        ];
        if spec.read_only_filesystem {
            args.push("--read-only".to_string());
        }
        if spec.run_as_non_root {
            args.push("--user=10001:10001".to_string());
        }
        for cap in &spec.dropped_capabilities {
            args.push(format!("--cap-drop={cap}"));
        }
        if spec.no_new_privileges {
            args.push("--security-opt=no-new-privileges:true".to_string());
        }
        match &spec.network {
            NetworkAttachment::None => args.push("--network=none".to_string()),
            NetworkAttachment::Bridge(name) => args.push(format!("--network={name}")),
        }
        for (key, value) in &spec.env {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push("--interactive".to_string());
        args.push(spec.image.clone());
        args.extend(spec.entrypoint.iter().cloned());
        args
    }
}

#[async_trait]
impl ContainerRuntime for CliContainerRuntime {
    async fn ensure_image(&self, image: &str) -> Result<(), Error> {
        let status = self
            .command()
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::infra(format!("failed to invoke {}: {e}", self.binary)))?;
        if status.success() {
            return Ok(());
        }
        let pull = self
            .command()
            .args(["pull", image])
            .status()
            .await
            .map_err(|e| Error::infra(format!("image pull failed: {e}")))?;
        if pull.success() {
            Ok(())
        } else {
            Err(Error::infra(format!("image pull failed for {image}")))
        }
    }

    async fn create(&self, spec: &ExecSpec) -> Result<String, Error> {
        let mut args = vec!["create".to_string()];
        args.extend(Self::confinement_args(spec));
        let output = self
            .command()
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::infra(format!("container create failed: {e}")))?;
        if !output.status.success() {
            return Err(Error::infra(format!(
                "container create failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn start(&self, container_id: &str, stdin: &[u8]) -> Result<(), Error> {
        let mut attach = self
            .command()
            .args(["start", "--attach", "--interactive", container_id])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::infra(format!("container start failed: {e}")))?;

        if let Some(mut child_stdin) = attach.stdin.take() {
            child_stdin
                .write_all(stdin)
                .await
                .map_err(|e| Error::infra(format!("failed to write stdin: {e}")))?;
        }
        // The child keeps running detached from this handle; `wait` polls
        // `docker wait` separately rather than awaiting this spawn, since
        // the deadline race lives there.
        drop(attach);
        Ok(())
    }

    async fn wait(&self, container_id: &str, deadline: Duration) -> Result<WaitOutcome, Error> {
        let wait = self.command().args(["wait", container_id]).output();
        match tokio::time::timeout(deadline, wait).await {
            Ok(Ok(output)) if output.status.success() => {
                let code = String::from_utf8_lossy(&output.stdout)
                    .trim()
                    .parse::<i32>()
                    .unwrap_or(-1);
                Ok(WaitOutcome::Exited(code))
            }
            Ok(Ok(output)) => Err(Error::infra(format!(
                "docker wait failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ))),
            Ok(Err(e)) => Err(Error::infra(format!("docker wait failed: {e}"))),
            Err(_) => Ok(WaitOutcome::TimedOut),
        }
    }

    async fn kill(&self, container_id: &str) -> Result<(), Error> {
        let status = self
            .command()
            .args(["kill", "--signal=SIGKILL", container_id])
            .status()
            .await
            .map_err(|e| Error::infra(format!("container kill failed: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::infra(format!("container kill failed for {container_id}")))
        }
    }

    async fn logs(&self, container_id: &str) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let output = self
            .command()
            .args(["logs", container_id])
            .output()
            .await
            .map_err(|e| Error::infra(format!("container logs failed: {e}")))?;
        Ok((output.stdout, output.stderr))
    }

    async fn stats(&self, container_id: &str) -> Option<Stats> {
        let output = self
            .command()
            .args(["stats", "--no-stream", "--format", "{{.CPUPerc}} {{.MemUsage}}", container_id])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_stats_line(&String::from_utf8_lossy(&output.stdout))
    }

    async fn remove(&self, container_id: &str) {
        if let Err(e) = self.command().args(["rm", "-f", container_id]).status().await {
            tracing::warn!(container_id, error = %e, "failed to remove container");
        }
    }
}

fn parse_stats_line(line: &str) -> Option<Stats> {
    // "12.34% 56MiB / 512MiB"
    let mut parts = line.split_whitespace();
    let cpu_pct: f64 = parts.next()?.trim_end_matches('%').parse().ok()?;
    let mem = parts.next()?;
    let mem_bytes = parse_memory_token(mem)?;
    Some(Stats { cpu_ms: (cpu_pct * 10.0) as u64, memory_peak_bytes: mem_bytes })
}

fn parse_memory_token(token: &str) -> Option<u64> {
    let (value, unit) = token.split_at(token.find(|c: char| c.is_alphabetic())?);
    let value: f64 = value.parse().ok()?;
    let multiplier = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * multiplier) as u64)
}
