//! Check schedule and interval parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often the rule is evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSchedule {
    /// `<N><unit>` where unit is one of `s`, `m`, `h`, `d` (e.g. `"5m"`).
    pub interval: String,
}

/// Parse an interval string like `"30s"`, `"5m"`, `"1h"`, `"2d"`.
///
/// Rejected intervals keep the rule out of the scheduler; zero-length
/// intervals are invalid.
pub fn parse_interval(interval: &str) -> Result<Duration, String> {
    let (value, unit) = interval.split_at(interval.len().saturating_sub(1));
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid interval format: '{interval}'"));
    }
    let n: u64 = value
        .parse()
        .map_err(|_| format!("invalid interval format: '{interval}'"))?;
    if n == 0 {
        return Err(format!("interval must be positive: '{interval}'"));
    }
    let secs = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3_600,
        "d" => n * 86_400,
        _ => return Err(format!("invalid interval format: '{interval}'")),
    };
    Ok(Duration::from_secs(secs))
}
