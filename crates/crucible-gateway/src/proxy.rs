//! Discovery, publish, and access-check requests are proxied to the
//! Registry unchanged (§4.9: "Discovery/access/publish requests are
//! proxied to Registry unchanged").

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use crucible_error::Error;
use serde_json::Value;

async fn forward(state: &AppState, method: Method, path: &str, query: Option<String>, body: Option<Value>) -> Response {
    let mut url = format!("{}/api/v1{path}", state.registry_base_url);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&query);
    }

    let mut request = state.http.request(method, &url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return ApiError(Error::infra(format!("registry request failed: {e}"))).into_response(),
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());

    match response.bytes().await {
        Ok(bytes) => {
            let mut headers = HeaderMap::new();
            if let Some(content_type) = content_type {
                headers.insert(axum::http::header::CONTENT_TYPE, content_type);
            }
            (status, headers, bytes).into_response()
        }
        Err(e) => ApiError(Error::infra(format!("malformed registry response: {e}"))).into_response(),
    }
}

/// `GET /api/v1/tools/search`.
pub async fn search_tools(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    forward(&state, Method::GET, "/tools/search", query, None).await
}

/// `GET /api/v1/tools/{name}@{version}`. `tool_ref` carries the `@`
/// unescaped — it's a valid path-segment character, so no extra decoding
/// is needed.
pub async fn resolve_tool(State(state): State<AppState>, Path(tool_ref): Path<String>) -> Response {
    forward(&state, Method::GET, &format!("/tools/{tool_ref}"), None, None).await
}

/// `POST /api/v1/tools/publish`.
pub async fn publish_tool(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, Method::POST, "/tools/publish", None, Some(body)).await
}

/// `POST /api/v1/tools/deprecate`.
pub async fn deprecate_tool(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    forward(&state, Method::POST, "/tools/deprecate", None, Some(body)).await
}

/// `GET /api/v1/access/check`.
pub async fn check_access(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    forward(&state, Method::GET, "/access/check", query, None).await
}
