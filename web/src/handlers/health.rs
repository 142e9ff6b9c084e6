//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use feria_core::FeriaError;
use serde::Serialize;

/// Readiness response body
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// `ready`, `degraded` or `unavailable`
    pub status: &'static str,
    /// Detail for non-ready states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness check.
///
/// Returns 200 OK whenever the process is serving. Does NOT check the store.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check: is the store reachable?
///
/// - 200 `ready`: store answered
/// - 200 `degraded`: store answered but holds more than one active fair
/// - 503 `unavailable`: store did not answer
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.lifecycle.active_fair().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                message: None,
            }),
        ),
        Err(FeriaError::InvariantViolation(message)) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "degraded",
                message: Some(message),
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    message: Some("store unreachable".to_string()),
                }),
            )
        }
    }
}
