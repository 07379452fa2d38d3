//! Alert rule management endpoints: listing, status, manual triggers,
//! history queries, and rule reload.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::require_admin;
use crate::state::AppState;

use super::{error_response, require_scheduler, ApiError};

/// List all loaded alert rules with their current state summary.
pub async fn list_rules(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let scheduler = require_scheduler(&state)?;

    let mut rules: Vec<_> = scheduler.rule_loader().rules().into_iter().collect();
    rules.sort_by(|(a, _), (b, _)| a.cmp(b));

    let data: Vec<Value> = rules
        .into_iter()
        .map(|(name, rule)| {
            let record = scheduler.state_manager().get_state(&name);
            json!({
                "name": name,
                "description": rule.description,
                "enabled": rule.enabled,
                "schedule": rule.schedule.interval,
                "severity": rule.metadata.severity,
                "state": record.state.as_str(),
                "last_checked": record.last_checked,
            })
        })
        .collect();

    Ok(Json(json!({"status": "success", "data": data})))
}

/// Detailed status of one rule: full condition plus the state record.
pub async fn rule_status(
    State(state): State<Arc<AppState>>,
    Path(rule_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let scheduler = require_scheduler(&state)?;

    let rule = scheduler.rule_loader().get(&rule_name).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Rule '{rule_name}' not found"),
        )
    })?;
    let record = scheduler.state_manager().get_state(&rule_name);

    Ok(Json(json!({
        "status": "success",
        "data": {
            "rule": {
                "name": rule.name,
                "description": rule.description,
                "enabled": rule.enabled,
                "schedule": rule.schedule.interval,
                "condition": {
                    "operator": rule.condition.operator,
                    "value": rule.condition.value,
                },
                "severity": rule.metadata.severity,
            },
            "state": record,
        }
    })))
}

/// Manually trigger an alert check (admin-only when auth is enabled).
pub async fn trigger_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.config, &headers)?;
    let scheduler = require_scheduler(&state)?;

    let event = scheduler.trigger_manual(&rule_name).await.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Rule '{rule_name}' not found"),
        )
    })?;

    Ok(Json(json!({"status": "success", "data": event})))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub rule_name: Option<String>,
    pub limit: Option<usize>,
    pub time_from: Option<String>,
}

/// Query alert history, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let scheduler = require_scheduler(&state)?;

    let limit = params.limit.unwrap_or(100);
    if !(1..=1000).contains(&limit) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "limit must be between 1 and 1000",
        ));
    }
    let time_from = params.time_from.as_deref().unwrap_or("now-24h");

    let events = scheduler
        .history()
        .get_history(params.rule_name.as_deref(), limit, time_from)
        .await;

    Ok(Json(json!({"status": "success", "data": events})))
}

/// Force a reload of rule files from disk (admin-only when auth is
/// enabled). Cancels all ticks, swaps the rule set, reinstalls.
pub async fn reload_rules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.config, &headers)?;
    let scheduler = require_scheduler(&state)?;

    scheduler.reload().await;
    let count = scheduler.rule_loader().get_enabled().len();

    Ok(Json(json!({
        "status": "success",
        "message": format!("Reloaded {count} enabled rules"),
    })))
}
