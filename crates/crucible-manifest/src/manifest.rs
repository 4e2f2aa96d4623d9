//! The tool manifest: the authoritative, immutable-once-published
//! description of one tool version (§3).

use crate::quantity::{Cpu, Memory};
use crate::security::{EgressPattern, SecretRef, SecurityPolicy};
use crate::status::ManifestStatus;
use crucible_core::ToolName;
use crucible_core::ToolVersionId;
use semver::Version;
use serde::{Deserialize, Serialize};

/// The container or WASM runtime a tool declares. Only `Container` is
/// normative; `Wasm` is representable but rejected at resolution time
/// (spec.md Open Question: "WASM runtime ... unspecified").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRuntime {
    Container,
    Wasm,
}

/// A fully materialized, immutable tool manifest as resolved from the
/// Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Synthetic primary key assigned by the Registry on publish.
    pub id: ToolVersionId,
    pub name: ToolName,
    #[serde(with = "version_serde")]
    pub version: Version,
    pub status: ManifestStatus,
    pub runtime: ToolRuntime,
    /// Required when `runtime = Container`.
    pub image: Option<String>,
    pub entrypoint: Vec<String>,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    pub timeout_ms: u32,
    pub cpu: Cpu,
    pub memory: Memory,
    pub security: SecurityPolicy,
    #[serde(default)]
    pub egress_allow: Vec<EgressPattern>,
    #[serde(default)]
    pub secrets: Vec<SecretRef>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Lower and upper bound on `timeout_ms`, per §3.
pub const MIN_TIMEOUT_MS: u32 = 1_000;
pub const MAX_TIMEOUT_MS: u32 = 600_000;

impl Manifest {
    /// Validate the static invariants a manifest must uphold independent of
    /// any particular execution: the timeout window, and that a container
    /// runtime declares an image.
    pub fn validate_static(&self) -> crucible_error::Result<()> {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(crucible_error::Error::validation_msg(format!(
                "timeout_ms {} outside [{MIN_TIMEOUT_MS}, {MAX_TIMEOUT_MS}]",
                self.timeout_ms
            )));
        }
        if self.runtime == ToolRuntime::Container && self.image.is_none() {
            return Err(crucible_error::Error::validation_msg(
                "container runtime requires an image reference",
            ));
        }
        Ok(())
    }

    /// Effective deadline in milliseconds, capped by the global maximum
    /// (§5: `min(budget_ms, manifest.timeout_ms, MAX_TIMEOUT_MS)`).
    #[must_use]
    pub fn effective_timeout_ms(&self, budget_ms: Option<u32>) -> u32 {
        let mut effective = self.timeout_ms.min(MAX_TIMEOUT_MS);
        if let Some(budget) = budget_ms {
            effective = effective.min(budget);
        }
        effective
    }

    /// A minimal published, container-runtime manifest fixture, used by
    /// this crate's own tests and by downstream crates' tests.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            id: ToolVersionId::v4(),
            name: ToolName::parse("t.echo").unwrap(),
            version: Version::parse("1.0.0").unwrap(),
            status: ManifestStatus::Published,
            runtime: ToolRuntime::Container,
            image: Some("registry.local/t-echo:1.0.0".to_string()),
            entrypoint: vec!["/app/run".to_string()],
            input_schema: serde_json::json!({"type": "object"}),
            output_schema: serde_json::json!({"type": "object"}),
            timeout_ms: 5_000,
            cpu: Cpu::parse("500m").unwrap(),
            memory: Memory::parse("512Mi").unwrap(),
            security: SecurityPolicy {
                run_as_non_root: true,
                filesystem: crate::security::FilesystemMode::ReadOnly,
                network: crate::security::NetworkMode::None,
            },
            egress_allow: vec![],
            secrets: vec![],
            capabilities: vec!["echo".to_string()],
        }
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(version: &Version, s: S) -> Result<S::Ok, S::Error> {
        version.to_string().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Version, D::Error> {
        let raw = String::deserialize(d)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
