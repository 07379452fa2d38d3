//! OpenSearch query definition for an alert rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relative time window for the query, e.g. `now-5m` .. `now`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

/// Query definition. `filter` and `aggregation` are opaque OpenSearch DSL
/// fragments authored by operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertQuery {
    /// Index patterns to search (joined with commas at query time).
    pub index: Vec<String>,
    #[serde(default = "default_time_field")]
    pub time_field: String,
    pub time_range: TimeRange,
    pub filter: Value,
    #[serde(default)]
    pub aggregation: Option<Value>,
}

fn default_time_field() -> String {
    "@timestamp".to_string()
}
