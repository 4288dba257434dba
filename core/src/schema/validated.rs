//! Records described by an explicit field table with defaults, converters
//! and validators.

use serde_json::{Map, Value};

use super::descriptor::{json_type_name, FieldSpec, SchemaDescriptor};
use super::ConventionAdapter;
use crate::error::{ApiError, ValidationError};

#[derive(Debug)]
pub(crate) struct ValidatedAdapter {
    descriptor: SchemaDescriptor,
}

impl ValidatedAdapter {
    pub(crate) fn new(descriptor: SchemaDescriptor) -> Self {
        Self { descriptor }
    }
}

fn apply(type_name: &str, spec: &FieldSpec, value: Value) -> Result<Value, ValidationError> {
    spec.apply(value)
        .map_err(|message| ValidationError::for_field(type_name, spec.name(), message))
}

impl ConventionAdapter for ValidatedAdapter {
    fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    fn outgoing(
        &self,
        type_name: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut out = Map::new();
        for (name, value) in fields {
            match self.descriptor.get(&name) {
                // Unset optional field.
                Some(spec) if value.is_null() && spec.is_optional() => {}
                Some(spec) => {
                    out.insert(name, apply(type_name, spec, value)?);
                }
                None => {
                    out.insert(name, value);
                }
            }
        }
        Ok(out)
    }

    fn incoming(&self, type_name: &str, raw: Value) -> Result<Value, ValidationError> {
        let mut raw = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::new(
                    type_name,
                    format!("expected a JSON object, got {}", json_type_name(&other)),
                ))
            }
        };

        let mut out = Map::new();
        for spec in self.descriptor.iter() {
            match (raw.remove(spec.name()), spec.default_value()) {
                (Some(value), _) => {
                    out.insert(spec.name().to_string(), apply(type_name, spec, value)?);
                }
                (None, Some(default)) => {
                    out.insert(spec.name().to_string(), apply(type_name, spec, default.clone())?);
                }
                (None, None) if spec.is_required() => {
                    return Err(ValidationError::for_field(
                        type_name,
                        spec.name(),
                        "field required",
                    ));
                }
                (None, None) => {}
            }
        }
        out.extend(raw);
        Ok(Value::Object(out))
    }

    fn partial(&self, type_name: &str, mut fields: Map<String, Value>) -> Result<Value, ApiError> {
        let mut out = Map::new();
        for spec in self.descriptor.iter() {
            match fields.remove(spec.name()) {
                Some(value) => {
                    out.insert(spec.name().to_string(), apply(type_name, spec, value)?);
                }
                None if spec.is_optional() => {}
                None => match spec.default_value() {
                    Some(default) => {
                        out.insert(
                            spec.name().to_string(),
                            apply(type_name, spec, default.clone())?,
                        );
                    }
                    None => {
                        return Err(ApiError::MissingRequiredField {
                            type_name: type_name.to_string(),
                            field: spec.name().to_string(),
                        });
                    }
                },
            }
        }
        out.extend(fields);
        Ok(Value::Object(out))
    }
}
