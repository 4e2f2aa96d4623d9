//! Sandbox confinement declared by a manifest.

use serde::{Deserialize, Serialize};

/// Filesystem mode for a tool's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilesystemMode {
    ReadOnly,
    ReadWrite,
}

/// Network mode for a tool's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    None,
    Restricted,
    Full,
}

/// The confinement a manifest declares for its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub run_as_non_root: bool,
    pub filesystem: FilesystemMode,
    pub network: NetworkMode,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            run_as_non_root: true,
            filesystem: FilesystemMode::ReadOnly,
            network: NetworkMode::None,
        }
    }
}

/// One egress allow-list entry (host or CIDR), only meaningful when
/// `network = Restricted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EgressPattern(pub String);

/// The name of a secret to inject into the container's environment. Never
/// the value — values are resolved at execution time via a `SecretSource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRef(pub String);

impl SecretRef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}
