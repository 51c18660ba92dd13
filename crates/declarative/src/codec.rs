//! Wire encoding boundary
//!
//! The remote API encodes booleans as "0"/"1", numbers as strings, and
//! select/multi-select fields as option maps of the form
//! `{"key": {"value": "Label", "selected": 1}}`. This module is the only
//! place those encodings are understood: [`decode`] is used when reading
//! remote state, [`encode`] when building request payloads, and [`coerce`]
//! when accepting caller input.

use crate::resource::FieldKind;
use crate::types::FieldValue;
use serde_json::Value;

const TRUTHY: &[&str] = &["1", "true", "yes", "on", "y"];
const FALSY: &[&str] = &["0", "false", "no", "off", "n", ""];

/// Whether a raw remote value is truthy
pub fn is_true(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|i| i != 0),
        Value::String(s) => TRUTHY.contains(&s.trim().to_ascii_lowercase().as_str()),
        _ => false,
    }
}

/// Keys of an option map whose entry is marked as selected
pub fn selected_keys(options: &serde_json::Map<String, Value>) -> Vec<String> {
    options
        .iter()
        .filter(|(_, option)| option.get("selected").is_some_and(is_true))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Decode a raw remote value into canonical form
pub fn decode(kind: FieldKind, raw: &Value) -> Result<FieldValue, String> {
    match (kind, raw) {
        (_, Value::Null) => Ok(FieldValue::Null),

        (FieldKind::Bool, _) => Ok(FieldValue::Bool(is_true(raw))),

        (FieldKind::Int, Value::Number(n)) => n
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| format!("expected an integer, got {n}")),
        (FieldKind::Int, Value::String(s)) if s.trim().is_empty() => Ok(FieldValue::Null),
        (FieldKind::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("expected an integer, got '{s}'")),

        (FieldKind::Select, Value::Object(options)) => Ok(selected_keys(options)
            .into_iter()
            .next()
            .map_or(FieldValue::Null, FieldValue::Text)),

        (FieldKind::List(_), Value::Object(options)) => {
            Ok(FieldValue::List(selected_keys(options)))
        }
        (FieldKind::List(separator), Value::String(s)) => Ok(FieldValue::List(
            s.split(separator)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect(),
        )),
        (FieldKind::List(_), Value::Array(items)) => Ok(FieldValue::List(
            items.iter().map(scalar_text).collect(),
        )),

        (_, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
        (_, Value::Number(n)) => Ok(FieldValue::Text(n.to_string())),
        (_, Value::Bool(b)) => Ok(FieldValue::Text(b.to_string())),
        (_, other) => Err(format!("unexpected value {other}")),
    }
}

/// Encode a canonical value for a request payload
pub fn encode(kind: FieldKind, value: &FieldValue) -> Value {
    match (kind, value) {
        (_, FieldValue::Null) => Value::String(String::new()),
        (FieldKind::List(separator), FieldValue::List(items)) => {
            Value::String(items.join(&separator.to_string()))
        }
        (_, FieldValue::Bool(b)) => Value::String(to_digit(*b).to_string()),
        (_, other) => Value::String(other.normalized()),
    }
}

/// Boolean as the remote's digit string
pub fn to_digit(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Coerce caller input into the canonical shape of a field
pub fn coerce(kind: FieldKind, value: &FieldValue) -> Result<FieldValue, String> {
    match (kind, value) {
        (_, FieldValue::Null) => Ok(FieldValue::Null),

        (FieldKind::Bool, FieldValue::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (FieldKind::Bool, FieldValue::Int(i)) if *i == 0 || *i == 1 => {
            Ok(FieldValue::Bool(*i == 1))
        }
        (FieldKind::Bool, FieldValue::Text(s)) => {
            let lowered = s.trim().to_ascii_lowercase();
            if TRUTHY.contains(&lowered.as_str()) {
                Ok(FieldValue::Bool(true))
            } else if FALSY.contains(&lowered.as_str()) {
                Ok(FieldValue::Bool(false))
            } else {
                Err(format!("'{s}' is not a valid boolean"))
            }
        }

        (FieldKind::Int, FieldValue::Int(i)) => Ok(FieldValue::Int(*i)),
        (FieldKind::Int, FieldValue::Text(s)) if s.trim().is_empty() => Ok(FieldValue::Null),
        (FieldKind::Int, FieldValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("'{s}' is not a valid integer")),

        (FieldKind::List(_), FieldValue::List(items)) => Ok(FieldValue::List(items.clone())),
        (FieldKind::List(_), FieldValue::Text(s)) if s.is_empty() => Ok(FieldValue::List(vec![])),
        (FieldKind::List(_), scalar) => Ok(FieldValue::List(vec![scalar.normalized()])),

        (FieldKind::Text | FieldKind::Select, FieldValue::List(_)) => {
            Err("expected a single value, got a list".to_string())
        }
        (FieldKind::Text | FieldKind::Select, scalar) => Ok(FieldValue::Text(scalar.normalized())),

        (_, other) => Err(format!("value '{other}' has the wrong type")),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
