//! Executes the OpenSearch query defined by an alert rule and reduces the
//! response to a single numeric value.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, warn};

use vigil_rules::schema::AlertRule;
use vigil_search::SearchClient;

/// Result of executing an alert query.
///
/// Query failures are values, not errors: the scheduler records an error
/// event and moves on, leaving rule state untouched.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub value: f64,
    pub took_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

/// Executes OpenSearch queries for alert rules.
pub struct QueryExecutor {
    client: Arc<SearchClient>,
}

impl QueryExecutor {
    pub fn new(client: Arc<SearchClient>) -> Self {
        Self { client }
    }

    /// Execute the rule's query and extract the numeric result.
    ///
    /// Count rules (no aggregation) yield the total hit count; aggregation
    /// rules yield the value at `condition.aggregation_field`.
    pub async fn execute(&self, rule: &AlertRule) -> QueryResult {
        let body = build_query_body(rule);
        let index = rule.query.index.join(",");

        match self.client.search(&index, &body).await {
            Ok(response) => {
                let took_ms = response.get("took").and_then(Value::as_u64).unwrap_or(0);
                let value = match (&rule.query.aggregation, &rule.condition.aggregation_field) {
                    (Some(_), Some(field)) => extract_aggregation_value(&response, field),
                    _ => extract_count(&response),
                };
                QueryResult {
                    value,
                    took_ms,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                error!(rule_name = %rule.name, error = %e, "query execution failed");
                QueryResult {
                    value: 0.0,
                    took_ms: 0,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Build the search body: the rule's filter and a synthesized time range
/// under `bool.must`, `size: 0` (alerting never needs documents), and the
/// aggregation (if any) under the fixed key `alert_agg`.
pub fn build_query_body(rule: &AlertRule) -> Value {
    let mut range_spec = serde_json::Map::new();
    range_spec.insert(
        rule.query.time_field.clone(),
        json!({
            "gte": rule.query.time_range.from,
            "lte": rule.query.time_range.to,
        }),
    );
    let time_range_filter = json!({ "range": range_spec });

    let mut body = json!({
        "size": 0,
        "query": {
            "bool": {
                "must": [rule.query.filter, time_range_filter]
            }
        }
    });

    if let Some(aggregation) = &rule.query.aggregation {
        body["aggs"] = json!({ "alert_agg": aggregation });
    }

    body
}

/// Extract the hit count. `hits.total` may be an object
/// (`{value, relation}`) or a bare integer depending on cluster settings.
fn extract_count(response: &Value) -> f64 {
    let total = &response["hits"]["total"];
    match total {
        Value::Object(_) => total.get("value").and_then(Value::as_f64).unwrap_or(0.0),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Extract an aggregation value using a dot-notation path.
///
/// `percentiles.95.0` navigates `aggregations.alert_agg.values["95.0"]`;
/// simple metrics (avg, sum, min, max) read `aggregations.alert_agg.value`.
fn extract_aggregation_value(response: &Value, agg_field: &str) -> f64 {
    let aggs = &response["aggregations"]["alert_agg"];

    if let Some(values) = aggs.get("values") {
        let parts: Vec<&str> = agg_field.split('.').collect();
        if parts.len() >= 2 {
            let key = parts[1..].join(".");
            return values.get(&key).and_then(Value::as_f64).unwrap_or(0.0);
        }
    }

    if let Some(value) = aggs.get("value") {
        return value.as_f64().unwrap_or(0.0);
    }

    warn!(field = agg_field, "could not extract aggregation value");
    0.0
}
