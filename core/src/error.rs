//! Error types for API definitions and calls.
//!
//! # Design
//! Every failure a caller of `Api::execute` can observe is a variant of
//! `ApiError`. Errors raised before any I/O (`Setup`, `MissingRequiredField`,
//! `RequestSerialization`, request-side `Validation`) are kept apart from the
//! ones produced by the round-trip (`Transport`, `HttpStatus`,
//! `MalformedResponse`, response-side `Validation`) so callers can decide on
//! retries without inspecting messages.

use thiserror::Error;

/// A declared validator, converter or type check rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}{}: {message}", field_suffix(.field))]
pub struct ValidationError {
    /// Name of the declared schema type being validated.
    pub type_name: String,
    /// Field that failed, when the failure is attributable to one.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(
        type_name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(".{field}"),
        None => String::new(),
    }
}

/// Errors returned by API definitions and `Api::execute`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The API declaration is missing or has an invalid attribute.
    #[error("invalid API definition: `{attribute}` {reason}")]
    Setup {
        attribute: &'static str,
        reason: String,
    },

    /// A required params/body field has neither a value nor a default.
    #[error("missing required field `{field}` on `{type_name}`")]
    MissingRequiredField { type_name: String, field: String },

    /// A params/body instance did not serialize to a JSON object.
    #[error("request `{type_name}` could not be serialized: {message}")]
    RequestSerialization { type_name: String, message: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {source}")]
    MalformedResponse {
        #[source]
        source: serde_json::Error,
        body: bytes::Bytes,
    },

    /// The server answered with a status code >= 400.
    #[error("HTTP {status}: {}", body_preview(.body))]
    HttpStatus {
        status: u16,
        body: bytes::Bytes,
        /// Decoded error payload, when the body was valid JSON.
        payload: Option<serde_json::Value>,
    },

    /// Network, timeout or protocol failure inside the transport backend.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub(crate) fn setup(attribute: &'static str, reason: impl Into<String>) -> Self {
        ApiError::Setup {
            attribute,
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Transport(Box::new(err))
    }

    /// Status code carried by an `HttpStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the error was raised before any request was sent.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ApiError::Setup { .. }
                | ApiError::MissingRequiredField { .. }
                | ApiError::RequestSerialization { .. }
        )
    }
}

const BODY_PREVIEW_LEN: usize = 256;

fn body_preview(body: &bytes::Bytes) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}
