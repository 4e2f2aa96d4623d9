//! A single `IntoResponse` impl for `crucible_error::Error` (§6: "a single
//! `axum` `IntoResponse` impl ... so every handler shares one mapping from
//! `ErrorKind` to HTTP status").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crucible_error::{Error, ErrorEnvelope, ErrorKind};

/// Wraps `crucible_error::Error` so it can be returned directly from an
/// `axum` handler. A newtype rather than an impl on the upstream type,
/// since `crucible-error` deliberately carries no `axum` dependency.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0.kind {
            ErrorKind::Validation { .. } => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound { .. } => StatusCode::NOT_FOUND,
            ErrorKind::AccessDenied { .. } => StatusCode::FORBIDDEN,
            ErrorKind::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::ResourceLimit { .. }
            | ErrorKind::Runtime { .. }
            | ErrorKind::Cancelled
            | ErrorKind::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorEnvelope::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn validation_maps_to_bad_request() {
        let response = ApiError(Error::validation_msg("bad input")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope.error.kind, "validation");
    }

    #[tokio::test]
    async fn access_denied_maps_to_forbidden() {
        let response = ApiError(Error::access_denied("no")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = ApiError(Error::not_found("tool x")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let response = ApiError(Error::timeout(std::time::Duration::from_secs(1))).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
