//! Notification actions attached to a rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Webhook endpoint configuration.
///
/// `body` is any JSON shape; `{{alert.<path>}}` placeholders inside its
/// string values are rendered at send time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

/// A single notification action. Every action currently delivers over a
/// webhook; `name` identifies the action in per-delivery results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertAction {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub name: String,
    pub webhook: WebhookConfig,
}

fn default_kind() -> String {
    "webhook".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}
