//! Manifest publication status and its monotonic transition rule.

use crucible_error::Error;
use serde::{Deserialize, Serialize};

/// The publication status of a tool version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Draft,
    Published,
    Deprecated,
    Archived,
}

impl ManifestStatus {
    /// Returns `true` if a version in this status can still be resolved by
    /// name for execution (§4.6: archived versions fail with `not_found`).
    #[must_use]
    pub fn is_resolvable(self) -> bool {
        !matches!(self, Self::Archived)
    }

    /// Returns `true` if `"latest"` resolution may select this status.
    #[must_use]
    pub fn is_latest_eligible(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Deprecated => write!(f, "deprecated"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Returns `true` if the transition from `from` to `to` is a legal step in
/// the append-only `draft -> published -> deprecated -> archived` machine.
#[must_use]
pub fn can_transition(from: ManifestStatus, to: ManifestStatus) -> bool {
    matches!(
        (from, to),
        (ManifestStatus::Draft, ManifestStatus::Published)
            | (ManifestStatus::Published, ManifestStatus::Deprecated)
            | (ManifestStatus::Deprecated, ManifestStatus::Archived)
    )
}

/// Validate a status transition, returning a `Validation` error on an
/// illegal edge.
pub fn validate_transition(from: ManifestStatus, to: ManifestStatus) -> crucible_error::Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(Error::validation_msg(format!(
            "illegal manifest status transition: {from} -> {to}"
        )))
    }
}
