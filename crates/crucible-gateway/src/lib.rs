#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Gateway
//!
//! The uniform HTTP surface (C9, spec.md §4.9): a thin `axum` router that
//! proxies discovery/publish/access requests to the Registry unchanged
//! and forwards execution requests to the Runner Orchestrator. Not on the
//! critical execution path beyond being the first hop — no retry or
//! caching logic lives here.

mod error;
mod executions;
mod health;
mod proxy;
mod state;

pub use error::ApiError;
pub use executions::{ExecuteRequestBody, ExecuteResponseBody};
pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full `/api/v1` router plus the unprefixed health routes.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tools/search", get(proxy::search_tools))
        .route("/api/v1/tools/{tool_ref}", get(proxy::resolve_tool))
        .route("/api/v1/tools/publish", post(proxy::publish_tool))
        .route("/api/v1/tools/deprecate", post(proxy::deprecate_tool))
        .route("/api/v1/access/check", get(proxy::check_access))
        .route("/api/v1/executions", post(executions::run_execution))
        .route(
            "/api/v1/executions/{id}",
            get(executions::get_execution).delete(executions::cancel_execution),
        )
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Waits for SIGTERM/SIGINT, grounded on the teacher CLI's
/// `tokio::signal` usage. On receipt, in-flight executions get `grace` to
/// finish on their own before every outstanding `CancellationToken` in
/// `state.cancellations` is force-cancelled. Handed to
/// `axum::serve(..).with_graceful_shutdown(..)`.
pub async fn shutdown_signal(state: AppState, grace: std::time::Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!(?grace, "shutdown signal received, draining in-flight executions");

    let drained = tokio::time::timeout(grace, async {
        while !state.cancellations.is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    })
    .await
    .is_ok();

    if !drained {
        tracing::warn!(remaining = state.cancellations.len(), "grace period elapsed, force-cancelling");
        for entry in state.cancellations.iter() {
            entry.value().cancel();
        }
    }
}
