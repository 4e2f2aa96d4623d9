//! The Runner Orchestrator (C7, §4.7): cache lookup, resolve, validate
//! input, execute with retry, validate output, persist, cache write.

use crate::journal::JournalSink;
use crate::secrets::SecretSource;
use crate::types::{ExecuteRequest, ExecuteResponse, Metrics};
use chrono::Utc;
use crucible_error::{Error, ErrorEnvelope};
use crucible_execution::{
    CacheKey, ExecutionRecord, ExecutionStatus, InputHash, JournalEntry, Stage, TerminalFields,
};
use crucible_manifest::{FilesystemMode, NetworkMode, ToolRuntime};
use crucible_registry::{ManifestResolver, RegistryClient};
use crucible_sandbox::{ContainerRuntime, ExecSpec, NetworkAttachment, StdinEnvelope};
use crucible_schema::{Direction, SchemaCache};
use crucible_store::{CacheStore, ExecutionStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

/// Everything the orchestrator needs to drive one `Execute` call end to
/// end. Each field is a trait object or a thin wrapper so tests can swap
/// every dependency for a fake without touching this struct.
pub struct Orchestrator {
    pub resolver: Arc<ManifestResolver>,
    pub registry: Arc<dyn RegistryClient>,
    pub schemas: Arc<SchemaCache>,
    pub executions: Arc<dyn ExecutionStore>,
    pub cache: Arc<dyn CacheStore>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub secrets: Arc<dyn SecretSource>,
    pub journal: Arc<dyn JournalSink>,
    pub retry_policy: crucible_resilience::RetryPolicy,
    /// Recommended range [10 min, 60 min] (§4.2); the idempotence cache
    /// entry's lifetime once a successful execution is stored.
    pub cache_ttl: chrono::Duration,
}

impl Orchestrator {
    /// Drive one `Execute(request)` call through to a response (§4.7).
    ///
    /// Scopes every journal/log event emitted below to one `tracing` span
    /// carrying `execution_id` and `tool_id`, so the audit record's
    /// human-readable counterpart can be filtered per execution.
    pub async fn execute(
        &self,
        request: ExecuteRequest,
        cancellation: &CancellationToken,
    ) -> Result<ExecuteResponse, Error> {
        let execution_id = request.execution_id.unwrap_or_else(crucible_core::ExecutionId::v4);
        let span = tracing::info_span!("execute", execution_id = %execution_id, tool_id = %request.tool_id);
        self.execute_inner(request, execution_id, cancellation).instrument(span).await
    }

    async fn execute_inner(
        &self,
        request: ExecuteRequest,
        execution_id: crucible_core::ExecutionId,
        cancellation: &CancellationToken,
    ) -> Result<ExecuteResponse, Error> {
        let started_at = Utc::now();

        let resolved = self.resolver.resolve(&request.tool_id, &request.version).await?;
        self.journal
            .record(JournalEntry::new(
                execution_id,
                Stage::Resolve,
                format!("{}@{}", request.tool_id, resolved.manifest.version),
                Utc::now(),
            ))
            .await;

        if resolved.manifest.runtime == ToolRuntime::Wasm {
            return Err(Error::validation_msg("wasm runtime not implemented"));
        }
        if !resolved.manifest.status.is_resolvable() {
            return Err(Error::not_found(format!("tool {}", request.tool_id)));
        }

        let allowed = self
            .registry
            .check_access(resolved.tool_version_id, request.agent_id, request.phase.as_deref(), None)
            .await;
        if !allowed {
            return Err(Error::access_denied("registry denied access to this tool version"));
        }

        let input_hash = InputHash::compute(&request.tool_id, &resolved.manifest.version, &request.input);
        let cache_key = CacheKey::new(resolved.tool_version_id, input_hash);

        if !request.skip_cache {
            if let Some(entry) = self.cache.lookup(cache_key).await? {
                self.cache.increment_hit(cache_key).await?;
                self.journal.record(JournalEntry::new(execution_id, Stage::CacheLookup, "hit", Utc::now())).await;
                if let Some(cached) = self.executions.get(entry.execution_id).await? {
                    return Ok(cached_response(cached, started_at));
                }
                warn!(execution_id = %execution_id, "cache entry pointed at a missing execution row");
            } else {
                self.journal.record(JournalEntry::new(execution_id, Stage::CacheLookup, "miss", Utc::now())).await;
            }
        }

        let record = ExecutionRecord::new(
            execution_id,
            request.tool_id.clone(),
            resolved.manifest.version.clone(),
            resolved.tool_version_id,
            request.run_id,
            request.agent_id,
            request.phase.clone(),
            request.trace_id.clone(),
            request.span_id.clone(),
            input_hash,
            request.input.clone(),
            started_at,
        );
        self.executions.create(record).await?;

        if let Err(validation_err) = self.schemas.validate(
            resolved.tool_version_id,
            Direction::Input,
            &resolved.manifest.input_schema,
            &request.input,
        ) {
            self.journal.record(JournalEntry::new(execution_id, Stage::ValidateInput, "rejected", Utc::now())).await;
            let completed_at = Utc::now();
            let duration_ms =
                u64::try_from((completed_at - started_at).num_milliseconds().max(0)).unwrap_or(u64::MAX);
            self.executions
                .complete(
                    execution_id,
                    TerminalFields {
                        status: ExecutionStatus::Failed,
                        output: None,
                        error: Some(validation_err.kind.clone()),
                        duration_ms,
                        cpu_ms: None,
                        memory_peak_bytes: None,
                        exit_code: None,
                        retry_count: 0,
                        completed_at,
                    },
                )
                .await?;
            self.journal.record(JournalEntry::new(execution_id, Stage::Persist, "terminal", Utc::now())).await;
            return Err(validation_err);
        }
        self.journal.record(JournalEntry::new(execution_id, Stage::ValidateInput, "ok", Utc::now())).await;

        let secret_values = self.secrets.resolve(&resolved.manifest.secrets).await?;
        let context = serde_json::json!({
            "execution_id": execution_id.to_string(),
            "run_id": request.run_id.to_string(),
            "agent_id": request.agent_id.map(|id| id.to_string()),
            "phase": request.phase,
            "trace_id": request.trace_id,
            "span_id": request.span_id,
        });
        let stdin = StdinEnvelope::new(request.input.clone(), context).to_bytes();

        let mut env: BTreeMap<String, String> = secret_values.into_iter().collect();
        env.insert("EXECUTION_ID".to_string(), execution_id.to_string());
        env.insert("RUN_ID".to_string(), request.run_id.to_string());

        let image = resolved
            .manifest
            .image
            .clone()
            .ok_or_else(|| Error::validation_msg("container runtime requires an image reference"))?;
        let network = match resolved.manifest.security.network {
            NetworkMode::None => NetworkAttachment::None,
            NetworkMode::Restricted | NetworkMode::Full => NetworkAttachment::Bridge("crucible-egress".to_string()),
        };
        let timeout_ms = resolved.manifest.effective_timeout_ms(request.budget_ms);
        let entrypoint = resolved.manifest.entrypoint.clone();
        let cpu_nanocores = resolved.manifest.cpu.nanocores();
        let memory_bytes = resolved.manifest.memory.bytes();
        let read_only_filesystem = resolved.manifest.security.filesystem == FilesystemMode::ReadOnly;
        let run_as_non_root = resolved.manifest.security.run_as_non_root;

        let runtime = Arc::clone(&self.runtime);
        let journal = Arc::clone(&self.journal);
        let attempt_result = crucible_resilience::run_with_retry(
            &self.retry_policy,
            timeout_ms,
            request.budget_ms,
            cancellation,
            |attempt, deadline| {
                let runtime = Arc::clone(&runtime);
                let journal = Arc::clone(&journal);
                let spec = ExecSpec {
                    image: image.clone(),
                    entrypoint: entrypoint.clone(),
                    stdin: stdin.clone(),
                    env: env.clone(),
                    cpu_nanocores,
                    memory_bytes,
                    read_only_filesystem,
                    run_as_non_root,
                    dropped_capabilities: vec!["ALL".to_string()],
                    no_new_privileges: true,
                    network: network.clone(),
                    deadline,
                    container_name: format!("crucible-{execution_id}-{attempt}"),
                };
                async move {
                    journal
                        .record(
                            JournalEntry::new(execution_id, Stage::Execute, format!("attempt {attempt}"), Utc::now())
                                .with_attempt(attempt),
                        )
                        .await;
                    let result = crucible_sandbox::run(runtime.as_ref(), &spec).await;
                    if result.ok {
                        Ok(result)
                    } else if result.timed_out {
                        Err(Error::timeout(result.duration))
                    } else {
                        let exec_err = result.error.clone().unwrap_or(crucible_sandbox::ExecError {
                            message: "tool failed with no error detail".to_string(),
                            retryable: false,
                        });
                        if exec_err.retryable {
                            Err(Error::infra(exec_err.message))
                        } else {
                            Err(Error::fatal(exec_err.message))
                        }
                    }
                }
            },
        )
        .await;

        let (exec, retry_count, outcome_error) = match attempt_result {
            Ok((result, retries)) => (Some(result), retries, None),
            Err((err, retries)) => (None, retries, Some(err)),
        };

        let completed_at = Utc::now();
        let duration_ms = u64::try_from((completed_at - started_at).num_milliseconds().max(0)).unwrap_or(u64::MAX);

        let terminal = if let Some(exec) = exec {
            self.journal.record(JournalEntry::new(execution_id, Stage::ValidateOutput, "checking", Utc::now())).await;
            let output = exec.output.clone().unwrap_or(serde_json::Value::Null);
            match self.schemas.validate(
                resolved.tool_version_id,
                Direction::Output,
                &resolved.manifest.output_schema,
                &output,
            ) {
                Ok(()) => TerminalFields {
                    status: ExecutionStatus::Succeeded,
                    output: Some(output),
                    error: None,
                    duration_ms,
                    cpu_ms: exec.cpu_ms,
                    memory_peak_bytes: exec.memory_peak_bytes,
                    exit_code: exec.exit_code,
                    retry_count,
                    completed_at,
                },
                Err(validation_err) => TerminalFields {
                    status: ExecutionStatus::Failed,
                    output: None,
                    error: Some(validation_err.kind),
                    duration_ms,
                    cpu_ms: exec.cpu_ms,
                    memory_peak_bytes: exec.memory_peak_bytes,
                    exit_code: exec.exit_code,
                    retry_count,
                    completed_at,
                },
            }
        } else {
            let err = outcome_error.unwrap_or_else(|| Error::unknown("execution failed with no error detail"));
            let status = if cancellation.is_cancelled() {
                ExecutionStatus::Cancelled
            } else if matches!(err.kind, crucible_error::ErrorKind::Timeout { .. }) {
                ExecutionStatus::Timeout
            } else {
                ExecutionStatus::Failed
            };
            TerminalFields {
                status,
                output: None,
                error: Some(err.kind),
                duration_ms,
                cpu_ms: None,
                memory_peak_bytes: None,
                exit_code: None,
                retry_count,
                completed_at,
            }
        };

        let succeeded = terminal.status == ExecutionStatus::Succeeded;
        let output = terminal.output.clone();
        let response_error = terminal.error.clone().map(|kind| ErrorEnvelope::from(&Error::new(kind)).error);
        let cpu_ms = terminal.cpu_ms;
        let memory_peak_bytes = terminal.memory_peak_bytes;

        self.executions.complete(execution_id, terminal).await?;
        self.journal.record(JournalEntry::new(execution_id, Stage::Persist, "terminal", Utc::now())).await;

        if succeeded && !request.skip_cache {
            self.cache.store(cache_key, execution_id, self.cache_ttl).await?;
            self.journal.record(JournalEntry::new(execution_id, Stage::CacheWrite, "stored", Utc::now())).await;
        }

        info!(execution_id = %execution_id, succeeded, retry_count, "execution finished");

        Ok(ExecuteResponse {
            ok: succeeded,
            execution_id,
            output,
            error: response_error,
            metrics: Metrics {
                duration_ms,
                cpu_ms,
                memory_peak_mb: memory_peak_bytes.map(|bytes| bytes as f64 / (1024.0 * 1024.0)),
                retry_count,
                started_at,
                completed_at,
            },
            artifacts: Vec::new(),
            cached: false,
        })
    }
}

/// Render a persisted `ExecutionRecord` as the response shape a fresh
/// `execute()` call would have returned, with `cached: true`. Used both by
/// the cache-hit path above and by callers fetching a past result by id
/// (§6: `GET /executions/{id}`).
#[must_use]
pub fn cached_response(record: ExecutionRecord, started_at: chrono::DateTime<Utc>) -> ExecuteResponse {
    let completed_at = record.completed_at.unwrap_or(started_at);
    ExecuteResponse {
        ok: record.status.is_success(),
        execution_id: record.id,
        output: record.output,
        error: record.error.map(|kind| ErrorEnvelope::from(&Error::new(kind)).error),
        metrics: Metrics {
            duration_ms: record.duration_ms.unwrap_or(0),
            cpu_ms: record.cpu_ms,
            memory_peak_mb: record.memory_peak_bytes.map(|bytes| bytes as f64 / (1024.0 * 1024.0)),
            retry_count: record.retry_count,
            started_at: record.created_at,
            completed_at,
        },
        artifacts: Vec::new(),
        cached: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::InMemoryJournalSink;
    use crate::secrets::NullSecretSource;
    use crucible_core::{RunId, ToolName};
    use crucible_manifest::Manifest;
    use crucible_registry::{FakeRegistryClient, VersionQuery};
    use crucible_sandbox::FakeContainerRuntime;
    use crucible_store::{InMemoryCacheStore, InMemoryExecutionStore};
    use serde_json::json;

    fn request() -> ExecuteRequest {
        ExecuteRequest {
            tool_id: ToolName::parse("t.echo").unwrap(),
            version: VersionQuery::Latest,
            input: json!({}),
            run_id: RunId::v4(),
            execution_id: None,
            agent_id: None,
            phase: None,
            trace_id: None,
            span_id: None,
            skip_cache: false,
            budget_ms: None,
        }
    }

    fn harness(manifest: Manifest, runtime: Arc<FakeContainerRuntime>) -> Orchestrator {
        Orchestrator {
            resolver: Arc::new(ManifestResolver::new(Arc::new(FakeRegistryClient::with_manifest(manifest)))),
            registry: Arc::new(FakeRegistryClient::with_manifest(Manifest::sample())),
            schemas: Arc::new(SchemaCache::default()),
            executions: Arc::new(InMemoryExecutionStore::default()),
            cache: Arc::new(InMemoryCacheStore::default()),
            runtime,
            secrets: Arc::new(NullSecretSource),
            journal: Arc::new(InMemoryJournalSink::default()),
            retry_policy: crucible_resilience::RetryPolicy { max_attempts: 2, base: 1.0, max_backoff: std::time::Duration::from_millis(1) },
            cache_ttl: chrono::Duration::minutes(30),
        }
    }

    #[tokio::test]
    async fn successful_execution_is_not_reported_as_cached() {
        let orchestrator = harness(
            Manifest::sample(),
            Arc::new(FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{}}"#.to_vec())),
        );
        let token = CancellationToken::new();
        let response = orchestrator.execute(request(), &token).await.unwrap();
        assert!(response.ok);
        assert!(!response.cached);
    }

    #[tokio::test]
    async fn second_call_with_same_input_is_served_from_cache() {
        let orchestrator = harness(
            Manifest::sample(),
            Arc::new(FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{}}"#.to_vec())),
        );
        let token = CancellationToken::new();
        orchestrator.execute(request(), &token).await.unwrap();
        let second = orchestrator.execute(request(), &token).await.unwrap();
        assert!(second.cached);
    }

    #[tokio::test]
    async fn skip_cache_always_re_executes() {
        let orchestrator = harness(
            Manifest::sample(),
            Arc::new(FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{}}"#.to_vec())),
        );
        let token = CancellationToken::new();
        orchestrator.execute(request(), &token).await.unwrap();
        let mut second_request = request();
        second_request.skip_cache = true;
        let second = orchestrator.execute(second_request, &token).await.unwrap();
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn invalid_input_never_creates_a_container() {
        let mut manifest = Manifest::sample();
        manifest.input_schema = json!({"type": "object", "required": ["name"]});
        let runtime = Arc::new(FakeContainerRuntime::succeeding(br#"{"ok":true,"output":{}}"#.to_vec()));
        let orchestrator = harness(manifest, Arc::clone(&runtime));
        let token = CancellationToken::new();
        let err = orchestrator.execute(request(), &token).await.unwrap_err();
        assert_eq!(err.wire_type(), "validation");
        assert_eq!(runtime.create_call_count(), 0);
    }

    #[tokio::test]
    async fn wasm_runtime_is_rejected() {
        let mut manifest = Manifest::sample();
        manifest.runtime = crucible_manifest::ToolRuntime::Wasm;
        let orchestrator = harness(manifest, Arc::new(FakeContainerRuntime::succeeding(Vec::new())));
        let token = CancellationToken::new();
        let err = orchestrator.execute(request(), &token).await.unwrap_err();
        assert_eq!(err.wire_type(), "validation");
    }

    #[tokio::test]
    async fn retries_exhausted_marks_execution_failed() {
        let orchestrator = harness(Manifest::sample(), Arc::new(FakeContainerRuntime::failing_pull()));
        let token = CancellationToken::new();
        let response = orchestrator.execute(request(), &token).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().kind, "runtime");
    }

    #[tokio::test]
    async fn invalid_input_persists_a_failed_execution_record() {
        let mut manifest = Manifest::sample();
        manifest.input_schema = json!({"type": "object", "required": ["name"]});
        let orchestrator = harness(manifest, Arc::new(FakeContainerRuntime::succeeding(Vec::new())));
        let token = CancellationToken::new();
        let execution_id = crucible_core::ExecutionId::v4();
        let mut req = request();
        req.execution_id = Some(execution_id);
        orchestrator.execute(req, &token).await.unwrap_err();
        let record = orchestrator.executions.get(execution_id).await.unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.unwrap().wire_type(), "validation");
    }

    #[tokio::test]
    async fn exhausted_timeouts_are_reported_as_timeout_with_retry_count() {
        let mut orchestrator = harness(Manifest::sample(), Arc::new(FakeContainerRuntime::timing_out()));
        orchestrator.retry_policy = crucible_resilience::RetryPolicy {
            max_attempts: 3,
            base: 1.0,
            max_backoff: std::time::Duration::from_millis(1),
        };
        let token = CancellationToken::new();
        let response = orchestrator.execute(request(), &token).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().kind, "timeout");
        assert_eq!(response.metrics.retry_count, 2);
    }
}
