//! Schema-validating models: types whose JSON Schema is derived with
//! `schemars`, checked against incoming and outgoing data.
//!
//! Top-level fields are coerced leniently first (numeric and boolean strings
//! where the schema expects numbers or booleans). The coerced document is
//! then validated with a `jsonschema` validator compiled once per type, so
//! every keyword the derived schema carries (`pattern`, `format`, bounds,
//! `oneOf`, `$ref`, ...) is enforced.

use std::fmt;

use jsonschema::Validator as SchemaValidator;
use schemars::JsonSchema;
use serde_json::{Map, Value};

use super::descriptor::{json_type_name, FieldKind, FieldSpec, SchemaDescriptor};
use super::ConventionAdapter;
use crate::error::{ApiError, ValidationError};

/// A JSON Schema document describing a model type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    root: Value,
}

impl ModelSchema {
    /// Derives the schema of `T` with `schemars`.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            root: serde_json::to_value(&root).unwrap_or_default(),
        }
    }

    /// Uses a hand-written schema document.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.root.get("properties").and_then(Value::as_object)
    }

    fn required(&self) -> Vec<&str> {
        self.root
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn resolve(&self, reference: &str) -> Option<&Value> {
        reference
            .strip_prefix('#')
            .and_then(|pointer| self.root.pointer(pointer))
    }

    /// Kind and nullability of a property schema, following references.
    fn field_kind(&self, schema: &Value) -> (FieldKind, bool) {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return match self.resolve(reference) {
                Some(target) => self.field_kind(target),
                None => (FieldKind::Any, false),
            };
        }
        match schema.get("type") {
            Some(Value::String(name)) => (
                FieldKind::from_json_type(name).unwrap_or(FieldKind::Any),
                name == "null",
            ),
            Some(Value::Array(names)) => {
                let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
                let kind = names
                    .iter()
                    .find_map(|n| FieldKind::from_json_type(n))
                    .unwrap_or(FieldKind::Any);
                (kind, names.contains(&"null"))
            }
            _ => {
                let options = schema
                    .get("anyOf")
                    .or_else(|| schema.get("oneOf"))
                    .or_else(|| schema.get("allOf"))
                    .and_then(Value::as_array);
                match options {
                    Some(options) => {
                        let kinds: Vec<_> = options.iter().map(|o| self.field_kind(o)).collect();
                        let nullable = kinds.iter().any(|(_, nullable)| *nullable);
                        let kind = kinds
                            .iter()
                            .map(|(kind, _)| *kind)
                            .find(|kind| *kind != FieldKind::Any)
                            .unwrap_or(FieldKind::Any);
                        (kind, nullable)
                    }
                    None => (FieldKind::Any, false),
                }
            }
        }
    }
}

pub(crate) struct ModelAdapter {
    schema: ModelSchema,
    descriptor: SchemaDescriptor,
    // A schema that fails to compile rejects every document with its error.
    validator: Result<SchemaValidator, String>,
}

impl ModelAdapter {
    pub(crate) fn new(schema: ModelSchema) -> Self {
        let required = schema.required();
        let mut descriptor = SchemaDescriptor::new();
        if let Some(properties) = schema.properties() {
            for (name, property) in properties {
                let (kind, nullable) = schema.field_kind(property);
                let mut spec = FieldSpec::new(name.clone(), kind);
                if !required.contains(&name.as_str()) {
                    spec = spec.optional();
                }
                if let Some(default) = property.get("default") {
                    spec = spec.default(default.clone());
                }
                if nullable && spec.is_required() {
                    spec = spec.optional();
                }
                descriptor = descriptor.field(spec);
            }
        }
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema.as_value())
            .map_err(|e| format!("invalid schema: {e}"));
        Self {
            schema,
            descriptor,
            validator,
        }
    }

    fn is_required(&self, name: &str) -> bool {
        self.descriptor.get(name).is_some_and(FieldSpec::is_required)
    }

    /// Lenient pass over top-level fields. Values that cannot be coerced
    /// are left for the validator to report.
    fn coerce(&self, fields: &mut Map<String, Value>) {
        for spec in self.descriptor.iter() {
            if let Some(value) = fields.get_mut(spec.name()) {
                if value.is_null() || matches_exactly(spec.kind(), value) {
                    continue;
                }
                if let Ok(coerced) = spec.kind().coerce(value.clone()) {
                    *value = coerced;
                }
            }
        }
    }

    fn missing(&self, type_name: &str, fields: &Map<String, Value>) -> Option<ValidationError> {
        self.descriptor
            .iter()
            .find(|spec| spec.is_required() && !fields.contains_key(spec.name()))
            .map(|spec| ValidationError::for_field(type_name, spec.name(), "field required"))
    }

    /// First violation reported by the compiled validator.
    fn check(&self, type_name: &str, document: &Value) -> Result<(), ValidationError> {
        let validator = self
            .validator
            .as_ref()
            .map_err(|message| ValidationError::new(type_name, message.clone()))?;
        match validator.iter_errors(document).next() {
            None => Ok(()),
            Some(error) => {
                let pointer = error.instance_path().to_string();
                let message = error.to_string();
                Err(match field_path(&pointer) {
                    Some(field) => ValidationError::for_field(type_name, field, message),
                    None => ValidationError::new(type_name, message),
                })
            }
        }
    }
}

impl fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("schema", &self.schema)
            .field("descriptor", &self.descriptor)
            .field("compiled", &self.validator.is_ok())
            .finish()
    }
}

impl ConventionAdapter for ModelAdapter {
    fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    fn outgoing(
        &self,
        type_name: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut out: Map<String, Value> = fields
            .into_iter()
            .filter(|(name, value)| !value.is_null() || self.is_required(name))
            .collect();
        self.coerce(&mut out);
        self.check(type_name, &Value::Object(out.clone()))?;
        Ok(out)
    }

    fn incoming(&self, type_name: &str, raw: Value) -> Result<Value, ValidationError> {
        let mut map = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::new(
                    type_name,
                    format!("expected a JSON object, got {}", json_type_name(&other)),
                ))
            }
        };
        for spec in self.descriptor.iter() {
            if let (false, Some(default)) = (map.contains_key(spec.name()), spec.default_value()) {
                map.insert(spec.name().to_string(), default.clone());
            }
        }
        if let Some(missing) = self.missing(type_name, &map) {
            return Err(missing);
        }
        self.coerce(&mut map);
        let document = Value::Object(map);
        self.check(type_name, &document)?;
        Ok(document)
    }

    fn partial(&self, type_name: &str, mut fields: Map<String, Value>) -> Result<Value, ApiError> {
        if let Some(missing) = self
            .descriptor
            .iter()
            .find(|spec| spec.is_required() && !fields.contains_key(spec.name()))
        {
            return Err(ApiError::MissingRequiredField {
                type_name: type_name.to_string(),
                field: missing.name().to_string(),
            });
        }
        self.coerce(&mut fields);
        let document = Value::Object(fields);
        self.check(type_name, &document)?;
        Ok(document)
    }
}

fn matches_exactly(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Any => true,
        FieldKind::Bool => value.is_boolean(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::String => value.is_string(),
        FieldKind::Array => value.is_array(),
        FieldKind::Object => value.is_object(),
    }
}

/// Dotted field path from a JSON pointer: `/data/0/length` becomes
/// `data[0].length`. The document root has no field.
fn field_path(pointer: &str) -> Option<String> {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if segment.parse::<usize>().is_ok() && !path.is_empty() {
            path.push_str(&format!("[{segment}]"));
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }
    (!path.is_empty()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct Fact {
        fact: String,
        length: u32,
    }

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct Page {
        #[schemars(range(max = 99))]
        current_page: u32,
        #[serde(default)]
        data: Vec<Fact>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<String>,
    }

    fn adapter() -> ModelAdapter {
        ModelAdapter::new(ModelSchema::of::<Page>())
    }

    #[test]
    fn descriptor_is_derived_from_the_schema() {
        let adapter = adapter();
        let descriptor = adapter.descriptor();
        let names: Vec<_> = descriptor.names().collect();
        assert_eq!(names, vec!["current_page", "data", "next"]);
        assert!(descriptor.get("current_page").unwrap().is_required());
        assert_eq!(descriptor.get("current_page").unwrap().kind(), FieldKind::Integer);
        assert!(!descriptor.get("data").unwrap().is_required());
        assert_eq!(descriptor.get("data").unwrap().kind(), FieldKind::Array);
        assert!(descriptor.get("next").unwrap().is_optional());
        assert_eq!(descriptor.get("next").unwrap().kind(), FieldKind::String);
    }

    #[test]
    fn incoming_accepts_valid_documents() {
        let raw = json!({"current_page": 1, "data": [{"fact": "x", "length": 1}]});
        assert_eq!(adapter().incoming("Page", raw.clone()).unwrap(), raw);
    }

    #[test]
    fn incoming_coerces_numeric_strings() {
        let out = adapter()
            .incoming("Page", json!({"current_page": "7", "data": []}))
            .unwrap();
        assert_eq!(out["current_page"], json!(7));
    }

    #[test]
    fn incoming_reports_nested_paths() {
        let err = adapter()
            .incoming("Page", json!({"current_page": 1, "data": [{"fact": "x"}]}))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("data[0]"));
        assert!(err.message.contains("length"), "{}", err.message);
    }

    #[test]
    fn incoming_enforces_bounds_and_types() {
        let err = adapter().incoming("Page", json!({"current_page": 101})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("current_page"));

        let err = adapter()
            .incoming("Page", json!({"current_page": 0, "data": "incorrect_type"}))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("data"));

        let err = adapter().incoming("Page", json!({"data": []})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("current_page"));
    }

    #[test]
    fn outgoing_drops_unset_optionals() {
        let out = adapter()
            .outgoing(
                "Page",
                match json!({"current_page": 3, "data": [], "next": null}) {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                },
            )
            .unwrap();
        assert_eq!(Value::Object(out), json!({"current_page": 3, "data": []}));
    }

    #[test]
    fn partial_requires_required_fields() {
        let err = adapter().partial("Page", Map::new()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingRequiredField { ref field, .. } if field == "current_page"
        ));
    }

    #[test]
    fn hand_written_schemas_are_supported() {
        let schema = ModelSchema::from_value(json!({
            "type": "object",
            "required": ["order"],
            "properties": {"order": {"type": "string", "enum": ["asc", "desc"]}},
            "additionalProperties": false
        }));
        let adapter = ModelAdapter::new(schema);
        assert!(adapter.incoming("Sort", json!({"order": "asc"})).is_ok());
        assert!(adapter.incoming("Sort", json!({"order": "up"})).is_err());
        let err = adapter
            .incoming("Sort", json!({"order": "asc", "extra": 1}))
            .unwrap_err();
        assert_eq!(err.field, None);
        assert!(err.message.contains("extra"), "{}", err.message);
    }

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct Contact {
        #[schemars(regex(pattern = r"^[a-z]+@[a-z]+\.com$"))]
        email: String,
    }

    #[test]
    fn pattern_is_enforced() {
        let adapter = ModelAdapter::new(ModelSchema::of::<Contact>());
        assert!(adapter
            .incoming("Contact", json!({"email": "cat@facts.com"}))
            .is_ok());
        let err = adapter
            .incoming("Contact", json!({"email": "NOT AN EMAIL"}))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("email"));
    }

    #[test]
    fn one_of_requires_exactly_one_match() {
        let adapter = ModelAdapter::new(ModelSchema::from_value(json!({
            "type": "object",
            "properties": {"n": {"oneOf": [{"type": "integer"}, {"type": "number"}]}}
        })));
        let err = adapter.incoming("Either", json!({"n": 1})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("n"));
        assert!(adapter.incoming("Either", json!({"n": 1.5})).is_ok());
    }

    #[test]
    fn outgoing_enforces_the_schema() {
        let err = adapter()
            .outgoing(
                "Page",
                match json!({"current_page": 500, "data": []}) {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                },
            )
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("current_page"));
    }

    #[test]
    fn pointers_become_dotted_paths() {
        assert_eq!(field_path(""), None);
        assert_eq!(field_path("/current_page").as_deref(), Some("current_page"));
        assert_eq!(field_path("/data/0/length").as_deref(), Some("data[0].length"));
        assert_eq!(field_path("/a~1b").as_deref(), Some("a/b"));
    }

    #[test]
    fn broken_schemas_reject_every_document() {
        let adapter = ModelAdapter::new(ModelSchema::from_value(json!({"type": 5})));
        let err = adapter.incoming("Broken", json!({})).unwrap_err();
        assert!(err.message.starts_with("invalid schema"), "{}", err.message);
    }
}
