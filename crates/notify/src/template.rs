//! `{{alert.<dot.path>}}` substitution in webhook bodies.
//!
//! This is a small structural substitution, not a template language: the
//! renderer recurses over maps and lists and regex-replaces on string
//! leaves, so placeholders survive anywhere inside a JSON body.

use regex::Regex;
use serde_json::Value;

/// Renders template variables in webhook bodies.
#[derive(Debug)]
pub struct TemplateRenderer {
    pattern: Regex,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\{\{alert\.([^}]+)\}\}").expect("template pattern is valid"),
        }
    }

    /// Recursively substitute `{{alert.<path>}}` with context values.
    ///
    /// Missing paths remain literally in place; non-string scalars pass
    /// through unchanged. Rendering a value free of placeholders returns
    /// it as-is.
    pub fn render(&self, template: &Value, context: &Value) -> Value {
        match template {
            Value::String(text) => Value::String(self.render_string(text, context)),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.render(v, context)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.render(v, context)).collect())
            }
            other => other.clone(),
        }
    }

    /// Replace all `{{alert.<path>}}` patterns in a string.
    fn render_string(&self, text: &str, context: &Value) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                match resolve_path(&caps[1], context) {
                    Some(value) => value_to_string(value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a dot-notation path against the context object.
fn resolve_path<'a>(path: &str, context: &'a Value) -> Option<&'a Value> {
    let mut current = context;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// The string form of a resolved value: strings unquoted, everything else
/// via JSON rendering.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
