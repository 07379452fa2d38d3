//! Alert history events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Fired,
    Resolved,
    Error,
    ManualTrigger,
}

/// Aggregate outcome over a rule's action fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Every action delivered.
    Success,
    /// Some delivered, some failed.
    Partial,
    /// No action delivered.
    Failed,
}

/// Per-action delivery outcome, preserved in order of the rule's actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    pub success: bool,
    pub status: String,
}

/// A single immutable alert event for history tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule_name: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub condition_met: bool,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(default)]
    pub notification_status: Option<NotificationStatus>,
    #[serde(default)]
    pub notification_results: Vec<ActionResult>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub query_took_ms: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AlertEvent {
    /// A bare event; callers fill in whichever fields apply.
    pub fn new(rule_name: impl Into<String>, event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            rule_name: rule_name.into(),
            event_type,
            timestamp,
            value: None,
            threshold: 0.0,
            operator: String::new(),
            condition_met: false,
            notification_sent: false,
            notification_status: None,
            notification_results: Vec::new(),
            metadata: HashMap::new(),
            query_took_ms: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(EventType::ManualTrigger).unwrap(),
            "manual_trigger"
        );
        assert_eq!(serde_json::to_value(EventType::Fired).unwrap(), "fired");
    }

    #[test]
    fn notification_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(NotificationStatus::Partial).unwrap(),
            "partial"
        );
    }

    #[test]
    fn event_roundtrips() {
        let mut event = AlertEvent::new("r1", EventType::Fired, Utc::now());
        event.value = Some(150.0);
        event.notification_status = Some(NotificationStatus::Success);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "fired");
        assert_eq!(json["notification_status"], "success");
        let back: AlertEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.value, Some(150.0));
    }
}
