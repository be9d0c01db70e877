//! Coercions over open `record_data` values
//!
//! Record values are untyped JSON. Filters, sorts and validation all go
//! through the same small set of coercions defined here.

use serde_json::Value;

use super::RecordId;

/// Whether a value counts as null: JSON null or the empty string
///
/// A missing field is handled by callers as `None` and is null as well.
pub fn is_null_like(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Same as [`is_null_like`] for an optional (possibly missing) field
pub fn is_missing(v: Option<&Value>) -> bool {
    v.map_or(true, is_null_like)
}

/// String form of a value
///
/// Strings are returned as-is, numbers and booleans as their JSON text,
/// null as the empty string, arrays as their comma-joined elements and
/// objects as compact JSON.
pub fn string_form(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(string_form)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => v.to_string(),
    }
}

/// Numeric form of a value, NaN when the value is not a number
pub fn numeric_form(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        _ => f64::NAN,
    }
}

/// Parse a finite number out of a string, NaN otherwise
pub fn parse_number(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => f64::NAN,
    }
}

/// Boolean form of a value
pub fn bool_form(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Parse a boolean spelled the ways the console submits them
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "si" | "sí" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Record identifier held by a foreign key value
pub fn id_form(v: &Value) -> Option<RecordId> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<RecordId>().ok(),
        _ => None,
    }
}
