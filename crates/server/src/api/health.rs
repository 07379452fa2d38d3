//! Health, liveness, and readiness endpoints.
//!
//! Liveness is unconditional; readiness checks OpenSearch and the
//! scheduler, so a degraded startup keeps the pod alive but out of
//! rotation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service banner.
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": "vigil alerting service",
        "version": VERSION,
        "environment": state.config.environment,
        "health": "/health",
    }))
}

/// Overall health including OpenSearch and scheduler status.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let opensearch = match &state.search {
        Some(client) => match client.cluster_health().await {
            Ok(health) => Some(json!({
                "status": health["status"],
                "nodes": health["number_of_nodes"],
            })),
            Err(e) => {
                warn!(error = %e, "OpenSearch health check failed");
                None
            }
        },
        None => None,
    };

    let scheduler_running = state
        .scheduler
        .as_ref()
        .map(|s| s.is_running())
        .unwrap_or(false);
    let rules_loaded = state
        .scheduler
        .as_ref()
        .map(|s| s.rule_loader().len())
        .unwrap_or(0);

    let status = if opensearch.is_some() && scheduler_running {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "version": VERSION,
        "environment": state.config.environment,
        "opensearch": opensearch,
        "scheduler": if scheduler_running { "running" } else { "stopped" },
        "rules_loaded": rules_loaded,
    }))
}

/// Liveness probe - always returns alive.
pub async fn liveness() -> Json<Value> {
    Json(json!({"status": "alive"}))
}

/// Readiness probe - checks OpenSearch and the scheduler.
pub async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let opensearch_ok = match &state.search {
        Some(client) => client.cluster_health().await.is_ok(),
        None => false,
    };
    if !opensearch_ok {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "reason": "OpenSearch unavailable"})),
        );
    }

    let scheduler_running = state
        .scheduler
        .as_ref()
        .map(|s| s.is_running())
        .unwrap_or(false);
    if !scheduler_running {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "reason": "Scheduler not running"})),
        );
    }

    (StatusCode::OK, Json(json!({"status": "ready"})))
}
