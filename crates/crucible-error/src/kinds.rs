//! Error kind taxonomy shared across the Crucible runner platform.
//!
//! One variant per row of the error-kind table: the kind determines both
//! the wire-level `type` string (§6) and whether the Retry & Budget
//! Controller may attempt the operation again (§7).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single JSON-Schema validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the document where the violation occurred.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
    /// The schema keyword that was violated (e.g. `"required"`, `"type"`).
    pub violated_rule: String,
}

/// The kind of a Crucible error, matching the wire-level `error.type` enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input or output failed JSON-Schema validation. Never retryable.
    Validation {
        /// Every violation found, not just the first.
        violations: Vec<Violation>,
    },
    /// A named resource (tool, version, execution) does not exist.
    NotFound {
        /// What was being looked up.
        resource: String,
    },
    /// The Registry denied access to the requested tool. Fail-closed.
    AccessDenied {
        /// Why access was denied, if known.
        reason: String,
    },
    /// The execution's deadline elapsed before the container finished.
    /// Retryable within the remaining budget.
    Timeout {
        /// How long the attempt ran before being killed.
        #[serde(with = "crate::duration_millis")]
        elapsed: Duration,
    },
    /// The container was killed for exceeding a CPU or memory limit. Not
    /// retryable by default (the input is assumed to be the cause).
    ResourceLimit {
        /// Which limit was exceeded.
        detail: String,
    },
    /// A tool-reported error, or an infrastructure failure (image pull,
    /// container create/start, malformed envelope, store I/O). Whether
    /// this is retryable depends on the origin — tools declare it
    /// explicitly; infrastructure failures are always retryable.
    Runtime {
        /// Description of the failure.
        detail: String,
        /// Whether the Retry Controller may attempt again.
        retryable: bool,
    },
    /// The caller disconnected or requested cancellation.
    Cancelled,
    /// Anything not covered by the other kinds.
    Unknown {
        /// Description of the failure.
        detail: String,
    },
}

impl ErrorKind {
    /// Whether the Retry & Budget Controller may attempt this operation
    /// again. Mirrors `RetryableError::is_retryable` in the teacher's error
    /// crate, but as an inherent method since `ErrorKind` is the only error
    /// representation in this workspace (no further subtyping).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::NotFound { .. }
            | Self::AccessDenied { .. }
            | Self::ResourceLimit { .. }
            | Self::Cancelled
            | Self::Unknown { .. } => false,
            Self::Timeout { .. } => true,
            Self::Runtime { retryable, .. } => *retryable,
        }
    }

    /// The wire-level `type` string used in HTTP error bodies (§6).
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::AccessDenied { .. } => "access_denied",
            Self::Timeout { .. } => "timeout",
            Self::ResourceLimit { .. } => "resource_limit",
            Self::Runtime { .. } => "runtime",
            Self::Cancelled => "cancelled",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { violations } => {
                write!(f, "validation failed ({} violation(s))", violations.len())
            }
            Self::NotFound { resource } => write!(f, "not found: {resource}"),
            Self::AccessDenied { reason } => write!(f, "access denied: {reason}"),
            Self::Timeout { elapsed } => write!(f, "timed out after {elapsed:?}"),
            Self::ResourceLimit { detail } => write!(f, "resource limit exceeded: {detail}"),
            Self::Runtime { detail, retryable } => {
                write!(f, "runtime error ({}): {detail}", if *retryable { "retryable" } else { "fatal" })
            }
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown { detail } => write!(f, "unknown error: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_never_retryable() {
        assert!(!ErrorKind::Validation { violations: vec![] }.is_retryable());
    }

    #[test]
    fn timeout_always_retryable() {
        assert!(ErrorKind::Timeout { elapsed: Duration::from_secs(1) }.is_retryable());
    }

    #[test]
    fn runtime_retryable_follows_flag() {
        assert!(ErrorKind::Runtime { detail: "pull failed".into(), retryable: true }.is_retryable());
        assert!(!ErrorKind::Runtime { detail: "bad tool".into(), retryable: false }.is_retryable());
    }

    #[test]
    fn wire_type_matches_spec_table() {
        assert_eq!(ErrorKind::Validation { violations: vec![] }.wire_type(), "validation");
        assert_eq!(ErrorKind::NotFound { resource: "x".into() }.wire_type(), "not_found");
        assert_eq!(ErrorKind::AccessDenied { reason: "x".into() }.wire_type(), "access_denied");
        assert_eq!(ErrorKind::Timeout { elapsed: Duration::ZERO }.wire_type(), "timeout");
        assert_eq!(ErrorKind::ResourceLimit { detail: "x".into() }.wire_type(), "resource_limit");
        assert_eq!(ErrorKind::Runtime { detail: "x".into(), retryable: false }.wire_type(), "runtime");
        assert_eq!(ErrorKind::Cancelled.wire_type(), "cancelled");
        assert_eq!(ErrorKind::Unknown { detail: "x".into() }.wire_type(), "unknown");
    }

    #[test]
    fn serde_roundtrip() {
        let kind = ErrorKind::Runtime { detail: "boom".into(), retryable: true };
        let json = serde_json::to_string(&kind).unwrap();
        let back: ErrorKind = serde_json::from_str(&json).unwrap();
        assert!(back.is_retryable());
    }
}
