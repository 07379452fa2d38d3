//! Threshold condition for firing an alert.

use serde::{Deserialize, Serialize};

/// Comparison of the query result against a numeric threshold.
///
/// `operator` is deliberately an open string: an unknown operator is not a
/// load error, it evaluates to "condition not met" with a diagnostic
/// message so one bad rule edit cannot take the rule set down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertCondition {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// One of `gt`, `gte`, `lt`, `lte`, `eq`.
    pub operator: String,
    pub value: f64,
    /// Dot path into the aggregation response naming the value to extract,
    /// e.g. `percentiles.95.0`. Required iff the query has an aggregation.
    #[serde(default)]
    pub aggregation_field: Option<String>,
}

fn default_kind() -> String {
    "threshold".to_string()
}
