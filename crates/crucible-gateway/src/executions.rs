//! `POST /executions`, `GET /executions/{id}`, `DELETE /executions/{id}`
//! (§6, §4.11).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use crucible_core::{AgentId, ExecutionId, RunId, ToolName};
use crucible_error::{Error, ErrorBody};
use crucible_registry::VersionQuery;
use crucible_runner::{cached_response, ExecuteRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequestBody {
    pub tool_id: String,
    pub version: String,
    pub input: Value,
    pub run_id: String,
    pub execution_id: Option<String>,
    pub agent_id: Option<String>,
    pub phase: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    #[serde(default)]
    pub skip_cache: bool,
    pub budget: Option<BudgetBody>,
}

#[derive(Debug, Deserialize)]
pub struct BudgetBody {
    pub ms: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponseBody {
    pub ok: bool,
    pub execution_id: ExecutionId,
    pub output: Option<Value>,
    pub error: Option<ErrorBody>,
    pub metrics: MetricsBody,
    pub artifacts: Vec<Value>,
    pub cached: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsBody {
    pub duration_ms: u64,
    pub cpu_ms: Option<u64>,
    pub memory_peak_mb: Option<f64>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl From<crucible_runner::ExecuteResponse> for ExecuteResponseBody {
    fn from(response: crucible_runner::ExecuteResponse) -> Self {
        Self {
            ok: response.ok,
            execution_id: response.execution_id,
            output: response.output,
            error: response.error,
            metrics: MetricsBody {
                duration_ms: response.metrics.duration_ms,
                cpu_ms: response.metrics.cpu_ms,
                memory_peak_mb: response.metrics.memory_peak_mb,
                retry_count: response.metrics.retry_count,
                started_at: response.metrics.started_at,
                completed_at: response.metrics.completed_at,
            },
            artifacts: response.artifacts,
            cached: response.cached,
        }
    }
}

fn parse_version(raw: &str) -> Result<VersionQuery, Error> {
    if raw.eq_ignore_ascii_case("latest") {
        return Ok(VersionQuery::Latest);
    }
    semver::Version::parse(raw)
        .map(VersionQuery::Exact)
        .map_err(|e| Error::validation_msg(format!("invalid version {raw:?}: {e}")))
}

fn into_execute_request(body: ExecuteRequestBody) -> Result<ExecuteRequest, Error> {
    let tool_id = ToolName::parse(&body.tool_id)
        .map_err(|e| Error::validation_msg(format!("invalid tool_id {:?}: {e}", body.tool_id)))?;
    let version = parse_version(&body.version)?;
    let run_id = RunId::parse(&body.run_id)
        .map_err(|e| Error::validation_msg(format!("invalid run_id {:?}: {e}", body.run_id)))?;
    let execution_id = body
        .execution_id
        .map(|raw| {
            ExecutionId::parse(&raw).map_err(|e| Error::validation_msg(format!("invalid execution_id {raw:?}: {e}")))
        })
        .transpose()?;
    let agent_id = body
        .agent_id
        .map(|raw| AgentId::parse(&raw).map_err(|e| Error::validation_msg(format!("invalid agent_id {raw:?}: {e}"))))
        .transpose()?;

    Ok(ExecuteRequest {
        tool_id,
        version,
        input: body.input,
        run_id,
        execution_id,
        agent_id,
        phase: body.phase,
        trace_id: body.trace_id,
        span_id: body.span_id,
        skip_cache: body.skip_cache,
        budget_ms: body.budget.and_then(|b| b.ms),
    })
}

/// `POST /api/v1/executions` (§6). Allocates the execution id up front (if
/// the caller didn't supply one) so a cancellation token can be registered
/// before the orchestrator starts work.
pub async fn run_execution(
    State(state): State<AppState>,
    Json(body): Json<ExecuteRequestBody>,
) -> Result<Json<ExecuteResponseBody>, ApiError> {
    let mut request = into_execute_request(body).map_err(ApiError)?;
    let execution_id = request.execution_id.unwrap_or_else(ExecutionId::v4);
    request.execution_id = Some(execution_id);

    let cancellation = CancellationToken::new();
    state.cancellations.insert(execution_id, cancellation.clone());

    let result = state.orchestrator.execute(request, &cancellation).await;
    state.cancellations.remove(&execution_id);

    result.map(|response| Json(ExecuteResponseBody::from(response))).map_err(ApiError)
}

/// `GET /api/v1/executions/{id}` (§6).
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecuteResponseBody>, ApiError> {
    let execution_id =
        ExecutionId::parse(&id).map_err(|e| ApiError(Error::validation_msg(format!("invalid execution id {id:?}: {e}"))))?;
    let record = state.executions.get(execution_id).await.map_err(ApiError)?;
    match record {
        Some(record) => {
            let started_at = record.created_at;
            Ok(Json(ExecuteResponseBody::from(cached_response(record, started_at))))
        }
        None => Err(ApiError(Error::not_found(format!("execution {execution_id}")))),
    }
}

/// `DELETE /api/v1/executions/{id}` (§4.11, §6). Best-effort: signals the
/// cancellation token if the execution is still in flight, returns 202.
/// 404 if unknown, 409 if already terminal (no cancellation token left to
/// signal, but a record exists). These three codes don't fit the generic
/// `ApiError` mapping, so this handler builds its response directly.
pub async fn cancel_execution(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let execution_id = match ExecutionId::parse(&id) {
        Ok(id) => id,
        Err(e) => return ApiError(Error::validation_msg(format!("invalid execution id {id:?}: {e}"))).into_response(),
    };

    if let Some(token) = state.cancellations.get(&execution_id) {
        token.cancel();
        return StatusCode::ACCEPTED.into_response();
    }

    match state.executions.get(execution_id).await {
        Ok(Some(_)) => StatusCode::CONFLICT.into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
