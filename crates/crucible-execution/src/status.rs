//! Execution-level status tracking (§3: `running, succeeded, failed,
//! timeout, cancelled`).

use serde::{Deserialize, Serialize};

/// The status of one tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created and actively executing (possibly across retry attempts).
    Running,
    /// The tool ran to completion and its output passed validation.
    Succeeded,
    /// The tool failed, a validation step rejected it, or retries were
    /// exhausted on a retryable error.
    Failed,
    /// The execution's deadline elapsed.
    Timeout,
    /// The caller cancelled the execution.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` if this status is terminal (§3 invariant 2: a
    /// terminal row is immutable except for being read).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns `true` if the execution succeeded (the only status the
    /// idempotence cache may reference, §3).
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Returns `true` if the transition from `from` to `to` is valid: the only
/// legal moves are `Running` to one of the four terminal states (§3
/// invariant: `running -> terminal` exactly once, §4.3).
#[must_use]
pub fn can_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    from == ExecutionStatus::Running && to != ExecutionStatus::Running
}
