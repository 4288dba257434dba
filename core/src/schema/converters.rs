//! Built-in field converters.
//!
//! Converters run before kind coercion and validators, on incoming values
//! and on outgoing ones, so each must leave an already converted value as is.

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{json_type_name, parse_bool, Converter, FieldKind};

/// `"true"`/`"false"` (also `yes`/`no`, `on`/`off`, `1`/`0`) and `0`/`1` to a
/// boolean.
pub fn to_bool() -> Converter {
    Arc::new(|v: Value| match v {
        Value::String(ref s) => parse_bool(s)
            .map(Value::Bool)
            .ok_or_else(|| format!("cannot convert `{s}` to a boolean")),
        other => FieldKind::Bool.coerce(other),
    })
}

pub fn to_int() -> Converter {
    Arc::new(|v: Value| FieldKind::Integer.coerce(v))
}

pub fn to_float() -> Converter {
    Arc::new(|v: Value| match v {
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("cannot convert `{n}` to a float")),
        other => FieldKind::Number.coerce(other),
    })
}

/// Renders scalars as strings; strings pass through.
pub fn to_string() -> Converter {
    Arc::new(|v: Value| match v {
        Value::String(s) => Ok(Value::String(s)),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(format!(
            "cannot convert {} to a string",
            json_type_name(&other)
        )),
    })
}

pub fn trim() -> Converter {
    Arc::new(|v: Value| match v {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Ok(other),
    })
}

pub fn lowercase() -> Converter {
    Arc::new(|v: Value| match v {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Ok(other),
    })
}

pub fn custom<F>(convert: F) -> Converter
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(convert)
}
