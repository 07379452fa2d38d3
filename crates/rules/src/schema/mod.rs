//! serde schema for alert rule definition files.
//!
//! One rule per JSON file. The query `filter` and `aggregation` sub-trees
//! are opaque OpenSearch DSL fragments carried as `serde_json::Value`;
//! the engine never inspects them beyond splicing into the request body.

mod action;
mod condition;
mod metadata;
mod query;
mod schedule;
mod throttle;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use action::{AlertAction, WebhookConfig};
pub use condition::AlertCondition;
pub use metadata::AlertMetadata;
pub use query::{AlertQuery, TimeRange};
pub use schedule::{parse_interval, AlertSchedule};
pub use throttle::AlertThrottle;

/// Complete alert rule definition.
///
/// `name` is the stable identity: state records and history events are
/// keyed by it, and it survives reloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub schedule: AlertSchedule,
    pub query: AlertQuery,
    pub condition: AlertCondition,
    pub actions: Vec<AlertAction>,
    pub throttle: AlertThrottle,
    pub metadata: AlertMetadata,
    /// Source file, filled in by the loader. Not part of the wire format.
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl AlertRule {
    /// Check the invariants serde cannot express.
    ///
    /// Aggregation rules must name an `aggregation_field` to extract;
    /// count rules must not carry one.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rule name must not be empty".to_string());
        }
        if self.query.index.is_empty() {
            return Err("query.index must list at least one index pattern".to_string());
        }
        if self.actions.is_empty() {
            return Err("actions must contain at least one webhook action".to_string());
        }
        if !self.condition.value.is_finite() {
            return Err("condition.value must be a finite number".to_string());
        }
        if self.throttle.value == 0 {
            return Err("throttle.value must be positive".to_string());
        }
        parse_interval(&self.schedule.interval)
            .map_err(|e| format!("schedule.interval: {e}"))?;
        match (
            self.query.aggregation.is_some(),
            self.condition.aggregation_field.is_some(),
        ) {
            (true, false) => {
                Err("aggregation queries require condition.aggregation_field".to_string())
            }
            (false, true) => {
                Err("condition.aggregation_field is set but query has no aggregation".to_string())
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}
