//! Declared request/response shapes and the adapter that marshals them.
//!
//! # Design
//! A schema type is any serde type implementing [`Schema`]. Its
//! [`Convention`] says how much metadata comes with it:
//!
//! - [`Convention::Record`]: plain serde records. The derive is the schema.
//! - [`Convention::Validated`]: an explicit [`SchemaDescriptor`] with kinds,
//!   defaults, converters and validators per field.
//! - [`Convention::Model`]: a JSON Schema document, usually derived with
//!   `schemars`, that incoming and outgoing data is checked against.
//!
//! [`SchemaAdapter`] reads the convention once, when an API is defined, and
//! afterwards dispatches on the stored variant. All conventions work on
//! `serde_json::Value` and hand the final value to serde, so the typed
//! instance is always produced by the type's own `Deserialize` impl.
//!
//! An optional field holding `None` is *unset*. Unset fields are left out of
//! outgoing payloads so the server's defaults apply; a field explicitly set
//! to its default value is sent.

mod descriptor;
mod model;
mod record;
mod validated;

pub mod converters;
pub mod validators;

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub use descriptor::{Converter, FieldKind, FieldSpec, SchemaDescriptor, Validator};
pub use model::ModelSchema;

use crate::error::{ApiError, ValidationError};
use model::ModelAdapter;
use record::RecordAdapter;
use validated::ValidatedAdapter;

/// A type usable as request params, request body or response body.
///
/// The default convention is a plain serde record:
///
/// ```rust
/// use quickapi_core::Schema;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Fact {
///     fact: String,
///     length: u32,
/// }
///
/// impl Schema for Fact {}
/// ```
pub trait Schema: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn convention() -> Convention {
        Convention::Record
    }
}

/// How a schema type describes its fields.
#[derive(Debug, Clone)]
pub enum Convention {
    Record,
    Validated(SchemaDescriptor),
    Model(ModelSchema),
}

impl Convention {
    /// Model convention with the schema derived from `T`.
    pub fn model<T: schemars::JsonSchema>() -> Self {
        Convention::Model(ModelSchema::of::<T>())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Convention::Record => "record",
            Convention::Validated(_) => "validated",
            Convention::Model(_) => "model",
        }
    }
}

/// Value-level operations every convention provides.
pub(crate) trait ConventionAdapter: fmt::Debug + Send + Sync {
    fn descriptor(&self) -> &SchemaDescriptor;

    /// Post-processes the serde output of an instance: drops unset fields,
    /// converts and validates the rest.
    fn outgoing(
        &self,
        type_name: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError>;

    /// Prepares raw input for deserialization: fills defaults, converts and
    /// validates.
    fn incoming(&self, type_name: &str, raw: Value) -> Result<Value, ValidationError>;

    /// Prepares an explicit subset of fields for construction. Required
    /// fields without a value or default are reported as missing.
    fn partial(&self, type_name: &str, fields: Map<String, Value>) -> Result<Value, ApiError>;
}

#[derive(Debug)]
enum AdapterKind {
    Record(RecordAdapter),
    Validated(ValidatedAdapter),
    Model(ModelAdapter),
}

impl AdapterKind {
    fn inner(&self) -> &dyn ConventionAdapter {
        match self {
            AdapterKind::Record(adapter) => adapter,
            AdapterKind::Validated(adapter) => adapter,
            AdapterKind::Model(adapter) => adapter,
        }
    }
}

/// Marshals instances of one schema type to and from JSON.
///
/// Built once per declared type; holds no per-call state.
pub struct SchemaAdapter<T> {
    type_name: String,
    convention: &'static str,
    kind: AdapterKind,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> SchemaAdapter<T> {
    pub fn new() -> Self {
        let convention = T::convention();
        let name = convention.name();
        let kind = match convention {
            Convention::Record => AdapterKind::Record(RecordAdapter::default()),
            Convention::Validated(descriptor) => {
                AdapterKind::Validated(ValidatedAdapter::new(descriptor))
            }
            Convention::Model(schema) => AdapterKind::Model(ModelAdapter::new(schema)),
        };
        Self {
            type_name: short_type_name::<T>(),
            convention: name,
            kind,
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn convention(&self) -> &'static str {
        self.convention
    }

    /// The declared fields. Empty for plain records, whose layout only serde
    /// knows.
    pub fn fields_of(&self) -> &SchemaDescriptor {
        self.kind.inner().descriptor()
    }

    /// Structured form of `instance`, without unset fields.
    pub fn serialize(&self, instance: &T) -> Result<Map<String, Value>, ApiError> {
        let value = serde_json::to_value(instance).map_err(|e| ApiError::RequestSerialization {
            type_name: self.type_name.clone(),
            message: e.to_string(),
        })?;
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ApiError::RequestSerialization {
                    type_name: self.type_name.clone(),
                    message: format!(
                        "expected a JSON object, got {}",
                        descriptor::json_type_name(&other)
                    ),
                })
            }
        };
        Ok(self.kind.inner().outgoing(&self.type_name, fields)?)
    }

    /// Validated instance built from raw input.
    pub fn deserialize(&self, raw: Value) -> Result<T, ApiError> {
        let prepared = self.kind.inner().incoming(&self.type_name, raw)?;
        T::deserialize(&prepared).map_err(|e| {
            let error = match missing_field::<T>(&e, &prepared) {
                Some(field) => ValidationError::for_field(&self.type_name, field, "field required"),
                None => ValidationError::new(&self.type_name, e.to_string()),
            };
            ApiError::Validation(error)
        })
    }

    /// Instance built from an explicit subset of fields; everything else
    /// stays unset or takes its default.
    pub fn construct(&self, fields: Map<String, Value>) -> Result<T, ApiError> {
        let prepared = self.kind.inner().partial(&self.type_name, fields)?;
        T::deserialize(&prepared).map_err(|e| match missing_field::<T>(&e, &prepared) {
            Some(field) => ApiError::MissingRequiredField {
                type_name: self.type_name.clone(),
                field,
            },
            None => ApiError::Validation(ValidationError::new(&self.type_name, e.to_string())),
        })
    }

    /// Instance with every field unset or defaulted.
    pub fn construct_default(&self) -> Result<T, ApiError> {
        self.construct(Map::new())
    }
}

impl<T: Schema> Default for SchemaAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SchemaAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaAdapter")
            .field("type_name", &self.type_name)
            .field("convention", &self.convention)
            .finish()
    }
}

/// Top-level field named by serde's "missing field `name`" error.
///
/// serde does not say where in the document the field was missing, so the
/// name is only attributed when filling it in at the top level changes the
/// outcome. Otherwise it went missing in a nested value and the caller keeps
/// serde's message.
fn missing_field<T: DeserializeOwned>(err: &serde_json::Error, prepared: &Value) -> Option<String> {
    let message = err.to_string();
    let rest = message.strip_prefix("missing field `")?;
    let field = rest.split('`').next()?;
    let Value::Object(map) = prepared else {
        return None;
    };
    if map.contains_key(field) {
        return None;
    }
    let mut filled = map.clone();
    filled.insert(field.to_string(), Value::Null);
    match T::deserialize(&Value::Object(filled)) {
        Err(again) if again.to_string() == message => None,
        _ => Some(field.to_string()),
    }
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);
    match full.find('<') {
        Some(idx) => format!("{short}{}", &full[idx..]),
        None => short.to_string(),
    }
}
