//! The execution record (§3): mutable while running, immutable once terminal.

use crate::idempotency::InputHash;
use crate::status::{can_transition, ExecutionStatus};
use chrono::{DateTime, Utc};
use crucible_core::{AgentId, ExecutionId, RunId, ToolName, ToolVersionId};
use crucible_error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use semver::Version;

/// One execution of one manifest with one input (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub tool_name: ToolName,
    #[serde(with = "version_serde")]
    pub tool_version: Version,
    pub tool_version_id: ToolVersionId,
    pub run_id: RunId,
    pub agent_id: Option<AgentId>,
    pub phase: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub input_hash: InputHash,
    pub input: serde_json::Value,
    pub status: ExecutionStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<ErrorKind>,
    pub duration_ms: Option<u64>,
    pub cpu_ms: Option<u64>,
    pub memory_peak_bytes: Option<u64>,
    pub exit_code: Option<i32>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The fields supplied when closing an execution out of the `running`
/// state (§4.3 `Complete`).
#[derive(Debug, Clone)]
pub struct TerminalFields {
    pub status: ExecutionStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<ErrorKind>,
    pub duration_ms: u64,
    pub cpu_ms: Option<u64>,
    pub memory_peak_bytes: Option<u64>,
    pub exit_code: Option<i32>,
    pub retry_count: u32,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Start a new record in the `running` state.
    #[must_use]
    pub fn new(
        id: ExecutionId,
        tool_name: ToolName,
        tool_version: Version,
        tool_version_id: ToolVersionId,
        run_id: RunId,
        agent_id: Option<AgentId>,
        phase: Option<String>,
        trace_id: Option<String>,
        span_id: Option<String>,
        input_hash: InputHash,
        input: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tool_name,
            tool_version,
            tool_version_id,
            run_id,
            agent_id,
            phase,
            trace_id,
            span_id,
            input_hash,
            input,
            status: ExecutionStatus::Running,
            output: None,
            error: None,
            duration_ms: None,
            cpu_ms: None,
            memory_peak_bytes: None,
            exit_code: None,
            retry_count: 0,
            created_at,
            completed_at: None,
        }
    }

    /// Apply terminal fields, enforcing the `running -> terminal` transition
    /// rule (§3 invariants 2–4) and the output/error presence invariant.
    ///
    /// A second call with fields identical to the already-recorded terminal
    /// state is accepted as a no-op (§4.3: "idempotent, or rejected") —
    /// anything else on an already-terminal record is rejected.
    pub fn complete(&mut self, fields: TerminalFields) -> crucible_error::Result<()> {
        if self.status.is_terminal() {
            let unchanged = self.status == fields.status
                && self.output == fields.output
                && self.retry_count == fields.retry_count;
            return if unchanged {
                Ok(())
            } else {
                Err(Error::validation_msg(format!(
                    "execution {} is already terminal ({}); refusing conflicting completion",
                    self.id, self.status
                )))
            };
        }
        if !can_transition(self.status, fields.status) {
            return Err(Error::validation_msg(format!(
                "illegal execution transition: {} -> {}",
                self.status, fields.status
            )));
        }
        if fields.completed_at < self.created_at {
            return Err(Error::validation_msg(
                "completed_at must not precede created_at",
            ));
        }
        let output_present = fields.output.is_some();
        let error_present = fields.error.is_some();
        match fields.status {
            ExecutionStatus::Succeeded if !output_present || error_present => {
                return Err(Error::validation_msg(
                    "succeeded record must carry output and no error",
                ));
            }
            ExecutionStatus::Failed | ExecutionStatus::Timeout | ExecutionStatus::Cancelled
                if output_present || !error_present =>
            {
                return Err(Error::validation_msg(
                    "non-succeeded terminal record must carry error and no output",
                ));
            }
            _ => {}
        }

        self.status = fields.status;
        self.output = fields.output;
        self.error = fields.error;
        self.duration_ms = Some(fields.duration_ms);
        self.cpu_ms = fields.cpu_ms;
        self.memory_peak_bytes = fields.memory_peak_bytes;
        self.exit_code = fields.exit_code;
        self.retry_count = fields.retry_count;
        self.completed_at = Some(fields.completed_at);
        Ok(())
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
