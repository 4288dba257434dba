//! Field-level schema metadata shared by every convention.

use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};
use strum::Display;

/// Checks a (converted) value; the error string becomes the message of a
/// `ValidationError`.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Normalizes a value before validation. Converters must be idempotent:
/// converting an already converted value returns it unchanged.
pub type Converter = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Semantic type of a field's JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Any,
    Bool,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl FieldKind {
    /// Parses a JSON Schema `type` keyword.
    pub fn from_json_type(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Bool),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Lax coercion into this kind: numeric and boolean strings are accepted
    /// where numbers and booleans are expected, integral floats where
    /// integers are.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (Self::Any, value) => Ok(value),
            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Self::Bool, Value::String(s)) => parse_bool(&s)
                .map(Value::Bool)
                .ok_or_else(|| format!("`{s}` is not a valid boolean")),
            (Self::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(format!("`{n}` is not a valid boolean")),
            },
            (Self::Integer, Value::Number(n)) => integer_from_number(&n)
                .ok_or_else(|| format!("`{n}` is not an integer")),
            (Self::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("`{s}` is not an integer")),
            (Self::Number, Value::Number(n)) => Ok(Value::Number(n)),
            (Self::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("`{s}` is not a number")),
            (Self::String, Value::String(s)) => Ok(Value::String(s)),
            (Self::Array, Value::Array(a)) => Ok(Value::Array(a)),
            (Self::Object, Value::Object(o)) => Ok(Value::Object(o)),
            (kind, other) => Err(format!("expected {kind}, got {}", json_type_name(&other))),
        }
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn integer_from_number(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| Value::from(f as i64))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a single field: kind, presence rules, default, and the
/// converters and validators applied to its value.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
    optional: bool,
    default: Option<Value>,
    converters: Vec<Converter>,
    validators: Vec<Validator>,
}

impl FieldSpec {
    /// A required field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            optional: false,
            default: None,
            converters: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Field that may be left unset (an `Option` on the Rust side). Unset
    /// fields are omitted from outgoing payloads.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// Value used when the field is absent. For non-optional fields it is
    /// also filled in when constructing an instance from partial input.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn convert(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Runs converters, kind coercion and validators, in that order.
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        if value.is_null() && self.optional {
            return Ok(value);
        }
        let value = self
            .converters
            .iter()
            .try_fold(value, |value, convert| convert(value))?;
        let value = self.kind.coerce(value)?;
        for validate in &self.validators {
            validate(&value)?;
        }
        Ok(value)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("converters", &self.converters.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Ordered field table of a declared schema type.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescriptor {
    fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing an earlier declaration with the same name.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
