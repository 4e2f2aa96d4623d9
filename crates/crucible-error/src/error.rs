//! The `Error` type used across every `crucible-*` crate.

use crate::kinds::{ErrorKind, Violation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured, taxonomized error.
///
/// Every fallible operation in this workspace returns `Result<T, Error>`.
/// `Error` carries enough structure to (a) decide retryability without
/// string matching, (b) serialize directly into the HTTP error envelope of
/// §6, and (c) be recorded verbatim on an execution row.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The error's taxonomy entry.
    pub kind: ErrorKind,
}

impl Error {
    /// Construct from a kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Shorthand for `ErrorKind::Validation`.
    #[must_use]
    pub fn validation(violations: Vec<Violation>) -> Self {
        Self::new(ErrorKind::Validation { violations })
    }

    /// Shorthand for `ErrorKind::Validation` with a single free-text
    /// violation (used where the failure does not come from a compiled
    /// JSON-Schema, e.g. manifest status-machine checks).
    #[must_use]
    pub fn validation_msg(message: impl Into<String>) -> Self {
        Self::validation(vec![Violation {
            path: String::new(),
            message: message.into(),
            violated_rule: "custom".to_string(),
        }])
    }

    /// Shorthand for `ErrorKind::NotFound`.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound { resource: resource.into() })
    }

    /// Shorthand for `ErrorKind::AccessDenied`.
    #[must_use]
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied { reason: reason.into() })
    }

    /// Shorthand for `ErrorKind::Timeout`.
    #[must_use]
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Self::new(ErrorKind::Timeout { elapsed })
    }

    /// Shorthand for `ErrorKind::ResourceLimit`.
    #[must_use]
    pub fn resource_limit(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceLimit { detail: detail.into() })
    }

    /// A retryable infrastructure failure (image pull, container
    /// create/start, store I/O).
    #[must_use]
    pub fn infra(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime { detail: detail.into(), retryable: true })
    }

    /// A fatal runtime failure (malformed envelope, non-zero exit with no
    /// envelope, or a tool declaring `retryable: false`).
    #[must_use]
    pub fn fatal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime { detail: detail.into(), retryable: false })
    }

    /// Shorthand for `ErrorKind::Cancelled`.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Shorthand for `ErrorKind::Unknown`.
    #[must_use]
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown { detail: detail.into() })
    }

    /// Whether the Retry & Budget Controller may attempt this operation
    /// again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// The wire-level `type` string (§6).
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        self.kind.wire_type()
    }
}

/// The `{error:{type, message, retryable}}` envelope from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for ErrorEnvelope {
    fn from(err: &Error) -> Self {
        Self {
            error: ErrorBody {
                kind: err.wire_type().to_string(),
                message: err.kind.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.retryable, self.message)
    }
}
