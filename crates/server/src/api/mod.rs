//! Management API endpoint modules.
//!
//! Success payloads use the `{"status": "success", "data": ...}` envelope;
//! failures return `{"status": "error", "message": ...}` with a matching
//! HTTP status.

mod alerts;
mod health;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use vigil_engine::AlertScheduler;

use crate::state::AppState;

pub use alerts::{get_history, list_rules, reload_rules, rule_status, trigger_rule};
pub use health::{health, liveness, readiness, root};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message: message.into(),
        }),
    )
}

// ── Degraded-mode guard ──────────────────────────────────────────

/// Return 503 when the alerting engine never came up (OpenSearch was
/// unreachable at startup).
pub(crate) fn require_scheduler(state: &AppState) -> Result<&Arc<AlertScheduler>, ApiError> {
    state.scheduler.as_ref().ok_or_else(|| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Alerting service not initialized",
        )
    })
}
