//! Turns typed params and body into a transport-ready `HttpRequest`.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::schema::{Schema, SchemaAdapter};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Static part of a request: URL, method and the adapters of the declared
/// params and body types. Shared by every call of an API.
#[derive(Debug)]
pub(crate) struct RequestTemplate<P, B> {
    pub(crate) url: String,
    pub(crate) method: HttpMethod,
    pub(crate) params: Option<SchemaAdapter<P>>,
    pub(crate) body: Option<SchemaAdapter<B>>,
}

impl<P: Schema, B: Schema> RequestTemplate<P, B> {
    /// Builds the request for one call.
    ///
    /// A declared params type with no params given is built from its
    /// defaults. The same goes for a declared body on POST, PUT and PATCH;
    /// on other methods a missing body is simply left out.
    pub(crate) fn build(&self, params: Option<&P>, body: Option<&B>) -> Result<HttpRequest, ApiError> {
        let mut request = HttpRequest::new(self.method, self.url.clone());
        request.set_header("accept", JSON_CONTENT_TYPE);

        if let Some(adapter) = &self.params {
            let fields = match params {
                Some(params) => adapter.serialize(params)?,
                None => adapter.serialize(&adapter.construct_default()?)?,
            };
            request.query = query_pairs(&fields);
        }

        if let Some(adapter) = &self.body {
            let fields = match body {
                Some(body) => Some(adapter.serialize(body)?),
                None if self.method.has_body() => {
                    Some(adapter.serialize(&adapter.construct_default()?)?)
                }
                None => None,
            };
            if let Some(fields) = fields {
                let encoded = serde_json::to_vec(&Value::Object(fields)).map_err(|e| {
                    ApiError::RequestSerialization {
                        type_name: adapter.type_name().to_string(),
                        message: e.to_string(),
                    }
                })?;
                request.set_header("content-type", JSON_CONTENT_TYPE);
                request.body = Some(encoded.into());
            }
        }

        Ok(request)
    }
}

/// Query parameters for a serialized params instance, in field order.
///
/// Strings are sent as is, numbers and booleans in their display form.
/// `null` is omitted, arrays become repeated keys and objects are sent as
/// compact JSON.
pub fn query_pairs(fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = query_value(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_value(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
