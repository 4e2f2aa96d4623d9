//! `GET /health` / `GET /ready` (§6 [ADDED]: "additionally reports
//! `{status, version, uptime_s}`").

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_s: u64,
}

/// Liveness: always `ok` once the process is serving requests.
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_s: state.started_at.elapsed().as_secs(),
    })
}

/// Readiness: identical payload today; kept as a distinct route so a
/// future dependency check (Registry reachability, store connectivity)
/// can fail it independently of liveness.
pub async fn ready(state: State<AppState>) -> Json<HealthBody> {
    health(state).await
}
