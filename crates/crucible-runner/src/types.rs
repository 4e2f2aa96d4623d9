//! `Execute(request) -> Response` (§4.7).

use chrono::{DateTime, Utc};
use crucible_core::{AgentId, ExecutionId, RunId, ToolName};
use crucible_error::ErrorBody;
use crucible_registry::VersionQuery;
use serde_json::Value;

/// The orchestrator's single public request type.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub tool_id: ToolName,
    pub version: VersionQuery,
    pub input: Value,
    pub run_id: RunId,
    pub execution_id: Option<ExecutionId>,
    pub agent_id: Option<AgentId>,
    pub phase: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub skip_cache: bool,
    pub budget_ms: Option<u32>,
}

/// Timing and resource metrics for one execution (§4.7 "Response shape").
#[derive(Debug, Clone)]
pub struct Metrics {
    pub duration_ms: u64,
    pub cpu_ms: Option<u64>,
    pub memory_peak_mb: Option<f64>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// `{ok, executionId, output?, error?, metrics, artifacts:[], cached}`
/// (§4.7). `artifacts` is always empty: no artifact side-channel exists in
/// this system (§1 Non-goals: "no side channels outside the JSON stdout
/// contract").
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    pub ok: bool,
    pub execution_id: ExecutionId,
    pub output: Option<Value>,
    pub error: Option<ErrorBody>,
    pub metrics: Metrics,
    pub artifacts: Vec<Value>,
    pub cached: bool,
}
