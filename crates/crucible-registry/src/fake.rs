//! A `RegistryClient` test double.

use crate::client::{ManifestWithId, RegistryClient, VersionQuery};
use async_trait::async_trait;
use crucible_core::{AgentId, ToolName, ToolVersionId};
use crucible_error::Error;
use crucible_manifest::Manifest;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

enum Script {
    Found(Manifest),
    NotFound,
}

/// A scripted `RegistryClient` for resolver and orchestrator tests.
pub struct FakeRegistryClient {
    script: Mutex<Script>,
    calls: AtomicU32,
    access_allowed: bool,
}

impl FakeRegistryClient {
    #[must_use]
    pub fn with_manifest(manifest: Manifest) -> Self {
        Self { script: Mutex::new(Script::Found(manifest)), calls: AtomicU32::new(0), access_allowed: true }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self { script: Mutex::new(Script::NotFound), calls: AtomicU32::new(0), access_allowed: true }
    }

    #[must_use]
    pub fn denying_access(mut self) -> Self {
        self.access_allowed = false;
        self
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for FakeRegistryClient {
    async fn get_tool(&self, _name: &ToolName, _version: &VersionQuery) -> Result<ManifestWithId, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.script.lock().unwrap() {
            Script::Found(manifest) => Ok(ManifestWithId {
                tool_version_id: manifest.id,
                manifest: manifest.clone(),
            }),
            Script::NotFound => Err(Error::not_found("tool")),
        }
    }

    async fn check_access(
        &self,
        _tool_version_id: ToolVersionId,
        _agent_id: Option<AgentId>,
        _phase: Option<&str>,
        _role: Option<&str>,
    ) -> bool {
        self.access_allowed
    }

    async fn get_capabilities(&self) -> Result<Vec<String>, Error> {
        Ok(vec!["echo".to_string()])
    }
}
