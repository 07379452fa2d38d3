//! Per-rule notification throttle.

use serde::{Deserialize, Serialize};

/// Minimum interval between notifications while a rule stays firing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertThrottle {
    pub value: u64,
    /// One of `seconds`, `minutes`, `hours`. Unknown units fall back to
    /// minutes.
    pub unit: String,
}

impl AlertThrottle {
    /// The throttle window in seconds.
    pub fn window_secs(&self) -> u64 {
        let multiplier = match self.unit.as_str() {
            "seconds" => 1,
            "minutes" => 60,
            "hours" => 3_600,
            _ => 60,
        };
        self.value * multiplier
    }
}
