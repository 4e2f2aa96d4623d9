//! The three Registry operations the Runner depends on (§4.8).

use async_trait::async_trait;
use crucible_core::{AgentId, ToolName, ToolVersionId};
use crucible_error::Error;
use crucible_manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which version of a tool to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionQuery {
    /// The highest semver-ordered `published` version.
    Latest,
    /// An exact version; must match precisely (§4.6).
    Exact(semver::Version),
}

impl fmt::Display for VersionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// A manifest together with the Registry-assigned identifier used to key
/// caches and schema validators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestWithId {
    pub tool_version_id: ToolVersionId,
    pub manifest: Manifest,
}

/// The Registry operations the Runner consumes (§4.8). The Registry's own
/// internals (publish, deprecate, capability indexing) live outside this
/// workspace's scope; this is the client-side contract only.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Resolve `(name, version)` into the fully materialized manifest.
    async fn get_tool(&self, name: &ToolName, version: &VersionQuery) -> Result<ManifestWithId, Error>;

    /// Whether `agent_id`/`phase`/`role` may invoke `tool_version_id`.
    /// Any transport or server error must be treated as denial (§4.8:
    /// "fail-closed on error").
    async fn check_access(
        &self,
        tool_version_id: ToolVersionId,
        agent_id: Option<AgentId>,
        phase: Option<&str>,
        role: Option<&str>,
    ) -> bool;

    /// The full set of discoverable capability tags. Not on the Runner's
    /// critical path; listed for completeness (§4.8).
    async fn get_capabilities(&self) -> Result<Vec<String>, Error>;
}

#[derive(Debug, Deserialize)]
struct AccessCheckResponse {
    allowed: bool,
}

/// A `RegistryClient` over the Registry's HTTP surface.
pub struct HttpRegistryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRegistryClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self { base_url: base_url.into(), http }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn get_tool(&self, name: &ToolName, version: &VersionQuery) -> Result<ManifestWithId, Error> {
        let url = format!("{}/api/v1/tools/{}@{}", self.base_url, name.as_str(), version);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::infra(format!("registry request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("tool {name}@{version}")));
        }
        if !response.status().is_success() {
            return Err(Error::infra(format!(
                "registry returned {} for {name}@{version}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::infra(format!("malformed registry response: {e}")))
    }

    async fn check_access(
        &self,
        tool_version_id: ToolVersionId,
        agent_id: Option<AgentId>,
        phase: Option<&str>,
        role: Option<&str>,
    ) -> bool {
        let mut request = self
            .http
            .get(format!("{}/api/v1/access/check", self.base_url))
            .query(&[("tool_version_id", tool_version_id.to_string())]);
        if let Some(agent_id) = agent_id {
            request = request.query(&[("agent_id", agent_id.to_string())]);
        }
        if let Some(phase) = phase {
            request = request.query(&[("phase", phase)]);
        }
        if let Some(role) = role {
            request = request.query(&[("role", role)]);
        }

        let outcome = request.send().await.and_then(reqwest::Response::error_for_status);
        match outcome {
            Ok(response) => response
                .json::<AccessCheckResponse>()
                .await
                .map(|body| body.allowed)
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn get_capabilities(&self) -> Result<Vec<String>, Error> {
        let url = format!("{}/api/v1/capabilities", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::infra(format!("registry request failed: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| Error::infra(format!("malformed registry response: {e}")))
    }
}
