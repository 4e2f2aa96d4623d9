//! Persisted audit-log rows for orchestration stages (§4.7 [ADDED]).
//!
//! This is the on-disk counterpart to the `tracing` span events the Runner
//! Orchestrator emits for the same steps: the audit trail must survive a
//! process restart, not just live in the tracing sink.

use chrono::{DateTime, Utc};
use crucible_core::ExecutionId;
use serde::{Deserialize, Serialize};

/// One orchestration stage of one execution, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The idempotence cache was checked for a prior result.
    CacheLookup,
    /// The manifest was resolved from the Registry (or its local cache).
    Resolve,
    /// The request input was validated against the manifest's input schema.
    ValidateInput,
    /// One sandboxed attempt of the tool ran.
    Execute,
    /// The tool's output was validated against the manifest's output schema.
    ValidateOutput,
    /// The terminal execution record was persisted to the store.
    Persist,
    /// A successful result was written to the idempotence cache.
    CacheWrite,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CacheLookup => "cache_lookup",
            Self::Resolve => "resolve",
            Self::ValidateInput => "validate_input",
            Self::Execute => "execute",
            Self::ValidateOutput => "validate_output",
            Self::Persist => "persist",
            Self::CacheWrite => "cache_write",
        };
        write!(f, "{s}")
    }
}

/// One row of the persisted audit trail for an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub execution_id: ExecutionId,
    pub stage: Stage,
    /// Free-form human-readable detail (e.g. "attempt 2 of 3", "cache hit").
    pub detail: String,
    pub at: DateTime<Utc>,
    /// The attempt number this entry belongs to, if the stage is
    /// attempt-scoped (`execute`, `validate_output`). `None` for stages
    /// that happen once per execution regardless of retry count.
    pub attempt: Option<u32>,
}

impl JournalEntry {
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        stage: Stage,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id,
            stage,
            detail: detail.into(),
            at,
            attempt: None,
        }
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_in_snake_case_on_the_wire() {
        let entry = JournalEntry::new(ExecutionId::v4(), Stage::CacheLookup, "miss", Utc::now());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["stage"], "cache_lookup");
    }

    #[test]
    fn with_attempt_sets_the_attempt_number() {
        let entry = JournalEntry::new(ExecutionId::v4(), Stage::Execute, "running", Utc::now())
            .with_attempt(2);
        assert_eq!(entry.attempt, Some(2));
    }

    #[test]
    fn stage_display_matches_wire_form() {
        assert_eq!(Stage::ValidateOutput.to_string(), "validate_output");
    }
}
