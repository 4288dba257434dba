//! Declarative, typed HTTP API clients.
//!
//! # Overview
//! An API is declared once (URL, method, params/body/response types) and
//! executed many times. Each call serializes the params into the query
//! string and the body into JSON, hands the request to a pluggable
//! transport, and parses the response into the declared type:
//!
//! ```text
//! Api::execute -> RequestTemplate::build -> Transport::send -> parse_response
//!                  (SchemaAdapter::serialize)                  (SchemaAdapter::deserialize)
//! ```
//!
//! # Design
//! - Schema types pick one of three conventions (`Record`, `Validated`,
//!   `Model`), chosen once when the API is built. See [`schema`].
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`),
//!   so the marshaling code never depends on a particular HTTP library.
//! - Status codes >= 400 are errors, reported uniformly as
//!   `ApiError::HttpStatus`. Nothing is retried.
//! - Calls are synchronous. An `Api` is immutable after `build` and can be
//!   cloned and shared across threads.

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod schema;
pub mod transport;
pub mod types;

pub use auth::{Auth, BasicAuth, BearerToken, HeaderApiKey, QueryApiKey};
pub use client::{Api, ApiBuilder};
pub use error::{ApiError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{parse_response, ApiResponse};
pub use schema::{Convention, FieldKind, FieldSpec, ModelSchema, Schema, SchemaAdapter, SchemaDescriptor};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{Transport, TransportConfig, UreqTransport};
pub use types::{NoBody, NoContent, NoParams};
