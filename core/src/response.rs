//! Turns a raw `HttpResponse` into a typed `ApiResponse` or an error.

use bytes::Bytes;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::schema::{Schema, SchemaAdapter};

/// A successful call: the parsed body plus the raw response it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<R> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub raw_body: Bytes,
    pub body: R,
}

impl<R> ApiResponse<R> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_body(self) -> R {
        self.body
    }
}

/// Parses `response` with the adapter of the declared response type.
///
/// - status >= 400: `HttpStatus`, with the body decoded as JSON when possible
/// - invalid JSON: `MalformedResponse`; an empty body reads as `null`
/// - shape mismatch: `Validation`
pub fn parse_response<R: Schema>(
    adapter: &SchemaAdapter<R>,
    response: HttpResponse,
) -> Result<ApiResponse<R>, ApiError> {
    let HttpResponse {
        status,
        headers,
        body,
    } = response;

    if status >= 400 {
        let payload = serde_json::from_slice(&body).ok();
        return Err(ApiError::HttpStatus {
            status,
            body,
            payload,
        });
    }

    let raw = decode_json(&body)?;
    let parsed = adapter.deserialize(raw)?;
    Ok(ApiResponse {
        status,
        headers,
        raw_body: body,
        body: parsed,
    })
}

fn decode_json(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|source| ApiError::MalformedResponse {
        source,
        body: body.clone(),
    })
}
