//! Built-in field validators.
//!
//! Each function returns a [`Validator`] to attach with
//! [`FieldSpec::validate`](super::FieldSpec::validate).

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{json_type_name, Validator};

fn numeric(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {}", json_type_name(value)))
}

fn length(value: &Value) -> Result<usize, String> {
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(a) => Ok(a.len()),
        Value::Object(o) => Ok(o.len()),
        other => Err(format!("{} has no length", json_type_name(other))),
    }
}

pub fn lt(bound: impl Into<f64>) -> Validator {
    let bound = bound.into();
    Arc::new(move |v: &Value| {
        if numeric(v)? < bound {
            Ok(())
        } else {
            Err(format!("must be less than {bound}"))
        }
    })
}

pub fn le(bound: impl Into<f64>) -> Validator {
    let bound = bound.into();
    Arc::new(move |v: &Value| {
        if numeric(v)? <= bound {
            Ok(())
        } else {
            Err(format!("must be less than or equal to {bound}"))
        }
    })
}

pub fn gt(bound: impl Into<f64>) -> Validator {
    let bound = bound.into();
    Arc::new(move |v: &Value| {
        if numeric(v)? > bound {
            Ok(())
        } else {
            Err(format!("must be greater than {bound}"))
        }
    })
}

pub fn ge(bound: impl Into<f64>) -> Validator {
    let bound = bound.into();
    Arc::new(move |v: &Value| {
        if numeric(v)? >= bound {
            Ok(())
        } else {
            Err(format!("must be greater than or equal to {bound}"))
        }
    })
}

/// Minimum length of a string (in characters), array or object.
pub fn min_len(min: usize) -> Validator {
    Arc::new(move |v: &Value| {
        if length(v)? >= min {
            Ok(())
        } else {
            Err(format!("length must be at least {min}"))
        }
    })
}

pub fn max_len(max: usize) -> Validator {
    Arc::new(move |v: &Value| {
        if length(v)? <= max {
            Ok(())
        } else {
            Err(format!("length must be at most {max}"))
        }
    })
}

pub fn not_empty() -> Validator {
    min_len(1)
}

/// Value must equal one of `allowed`.
pub fn one_of<I, V>(allowed: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    Arc::new(move |v: &Value| {
        if allowed.contains(v) {
            Ok(())
        } else {
            Err(format!("must be one of {}", Value::Array(allowed.clone())))
        }
    })
}

/// Wraps an arbitrary predicate.
pub fn custom<F>(check: F) -> Validator
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
{
    Arc::new(check)
}
