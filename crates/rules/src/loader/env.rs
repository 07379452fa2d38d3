//! `${ENV_VAR}` placeholder resolution over rule documents.

use regex::Regex;
use serde_json::Value;

/// Recursively replace `${ENV_VAR}` patterns in every string value of a
/// JSON document with the environment variable's value.
///
/// Unresolved placeholders are preserved verbatim so a missing variable
/// is visible in the loaded rule rather than silently blanked.
pub fn resolve_env_vars(value: &Value, pattern: &Regex) -> Value {
    match value {
        Value::String(s) => {
            let resolved = pattern.replace_all(s, |caps: &regex::Captures<'_>| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            });
            Value::String(resolved.into_owned())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_env_vars(v, pattern)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve_env_vars(v, pattern)).collect())
        }
        other => other.clone(),
    }
}

/// Compile the `${VAR}` pattern.
pub(super) fn env_var_pattern() -> Regex {
    Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
}
