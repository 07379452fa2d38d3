//! Rule metadata for categorization and ownership.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertMetadata {
    /// One of `critical`, `high`, `medium`, `low`.
    pub severity: String,
    pub category: String,
    pub owner: String,
    #[serde(default)]
    pub runbook: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
