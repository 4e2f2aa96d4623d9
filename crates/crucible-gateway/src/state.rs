//! Shared state handed to every route handler.

use crucible_core::ExecutionId;
use crucible_runner::Orchestrator;
use crucible_store::ExecutionStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// State shared across the `axum` router.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Kept separately from `orchestrator.executions` so `GET
    /// /executions/{id}` works without reaching into the orchestrator's
    /// private fields.
    pub executions: Arc<dyn ExecutionStore>,
    pub registry_base_url: String,
    pub http: reqwest::Client,
    /// Cancellation tokens for in-flight executions, keyed by execution id
    /// (§4.11). An entry exists only while the execution is running.
    pub cancellations: Arc<DashMap<ExecutionId, CancellationToken>>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        executions: Arc<dyn ExecutionStore>,
        registry_base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            orchestrator,
            executions,
            registry_base_url: registry_base_url.into(),
            http,
            cancellations: Arc::new(DashMap::new()),
            started_at: Instant::now(),
        }
    }
}
