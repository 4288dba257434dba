//! Plain serde records: the derive is the whole schema.

use serde_json::{Map, Value};

use super::descriptor::SchemaDescriptor;
use super::ConventionAdapter;
use crate::error::{ApiError, ValidationError};

/// Passes values through untouched and lets serde decide which fields are
/// required, defaulted or skipped (`#[serde(default)]`,
/// `skip_serializing_if`).
#[derive(Debug, Default)]
pub(crate) struct RecordAdapter {
    descriptor: SchemaDescriptor,
}

impl ConventionAdapter for RecordAdapter {
    fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    fn outgoing(
        &self,
        _type_name: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        Ok(fields)
    }

    fn incoming(&self, _type_name: &str, raw: Value) -> Result<Value, ValidationError> {
        Ok(raw)
    }

    fn partial(&self, _type_name: &str, fields: Map<String, Value>) -> Result<Value, ApiError> {
        Ok(Value::Object(fields))
    }
}
