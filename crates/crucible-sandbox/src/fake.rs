//! A `ContainerRuntime` test double, so the retry controller and the
//! execution algorithm can be tested without a real container daemon.

use crate::runtime::{ContainerRuntime, Stats, WaitOutcome};
use crate::spec::ExecSpec;
use async_trait::async_trait;
use crucible_error::Error;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Script {
    Exit { code: i32, stdout: Vec<u8> },
    TimeOut,
    FailPull,
}

/// A scripted `ContainerRuntime` for unit tests.
pub struct FakeContainerRuntime {
    script: Script,
    provide_stats: bool,
    create_calls: Mutex<u32>,
}

impl FakeContainerRuntime {
    /// A container that exits 0 with the given stdout bytes.
    #[must_use]
    pub fn succeeding(stdout: Vec<u8>) -> Self {
        Self::exiting(0, stdout)
    }

    /// A container that exits with `code` and the given stdout bytes.
    #[must_use]
    pub fn exiting(code: i32, stdout: Vec<u8>) -> Self {
        Self { script: Script::Exit { code, stdout }, provide_stats: true, create_calls: Mutex::new(0) }
    }

    /// A container whose wait never resolves before the deadline.
    #[must_use]
    pub fn timing_out() -> Self {
        Self { script: Script::TimeOut, provide_stats: true, create_calls: Mutex::new(0) }
    }

    /// A runtime that fails at the image-pull step.
    #[must_use]
    pub fn failing_pull() -> Self {
        Self { script: Script::FailPull, provide_stats: true, create_calls: Mutex::new(0) }
    }

    /// Make `stats` return `None`, simulating a daemon that can't report
    /// usage for this container.
    #[must_use]
    pub fn without_stats(mut self) -> Self {
        self.provide_stats = false;
        self
    }

    /// How many times `create` was invoked — useful for asserting that
    /// retries get a fresh container each attempt.
    #[must_use]
    pub fn create_call_count(&self) -> u32 {
        *self.create_calls.lock()
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn ensure_image(&self, _image: &str) -> Result<(), Error> {
        if matches!(self.script, Script::FailPull) {
            Err(Error::infra("image pull failed"))
        } else {
            Ok(())
        }
    }

    async fn create(&self, _spec: &ExecSpec) -> Result<String, Error> {
        *self.create_calls.lock() += 1;
        Ok("fake-container-id".to_string())
    }

    async fn start(&self, _container_id: &str, _stdin: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    async fn wait(&self, _container_id: &str, _deadline: Duration) -> Result<WaitOutcome, Error> {
        match &self.script {
            Script::Exit { code, .. } => Ok(WaitOutcome::Exited(*code)),
            Script::TimeOut => Ok(WaitOutcome::TimedOut),
            Script::FailPull => unreachable!("ensure_image already failed"),
        }
    }

    async fn kill(&self, _container_id: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn logs(&self, _container_id: &str) -> Result<(Vec<u8>, Vec<u8>), Error> {
        match &self.script {
            Script::Exit { stdout, .. } => Ok((stdout.clone(), Vec::new())),
            _ => Ok((Vec::new(), Vec::new())),
        }
    }

    async fn stats(&self, _container_id: &str) -> Option<Stats> {
        self.provide_stats.then_some(Stats { cpu_ms: 5, memory_peak_bytes: 1024 })
    }

    async fn remove(&self, _container_id: &str) {}
}
