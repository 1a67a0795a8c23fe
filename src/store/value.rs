//! Converting store values to text

use serde_json::Value;

/// Text substituted for a placeholder bound to `value`
///
/// Strings are inserted raw, arrays are joined with commas and objects are
/// written as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Parse a command-line style value: JSON when it parses, otherwise a plain string
pub fn parse_loose(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
