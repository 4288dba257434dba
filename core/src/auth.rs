//! Credential providers.
//!
//! A provider amends an outgoing `HttpRequest` (a header or a query
//! parameter) right before it is handed to the transport. Custom schemes
//! implement [`Auth`] directly.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ApiError;
use crate::http::HttpRequest;

pub trait Auth: fmt::Debug + Send + Sync {
    fn apply(&self, request: &mut HttpRequest) -> Result<(), ApiError>;
}

/// `Authorization: Basic base64(user:password)`.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Auth for BasicAuth {
    fn apply(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        request.set_header("authorization", format!("Basic {encoded}"));
        Ok(())
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Auth for BearerToken {
    fn apply(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        request.set_header("authorization", format!("Bearer {}", self.0));
        Ok(())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// API key sent in a custom header, e.g. `x-api-key`.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderApiKey {
    header: String,
    key: String,
}

impl HeaderApiKey {
    pub fn new(header: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            key: key.into(),
        }
    }
}

impl Auth for HeaderApiKey {
    fn apply(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        if !is_header_token(&self.header) {
            return Err(ApiError::setup(
                "auth",
                format!("`{}` is not a valid header name", self.header),
            ));
        }
        request.set_header(self.header.clone(), self.key.clone());
        Ok(())
    }
}

impl fmt::Debug for HeaderApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderApiKey")
            .field("header", &self.header)
            .field("key", &"***")
            .finish()
    }
}

/// API key sent as a query parameter, e.g. `?key=...`.
#[derive(Clone, PartialEq, Eq)]
pub struct QueryApiKey {
    param: String,
    key: String,
}

impl QueryApiKey {
    pub fn new(param: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            key: key.into(),
        }
    }
}

impl Auth for QueryApiKey {
    fn apply(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        request.query.retain(|(name, _)| name != &self.param);
        request.query.push((self.param.clone(), self.key.clone()));
        Ok(())
    }
}

impl fmt::Debug for QueryApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryApiKey")
            .field("param", &self.param)
            .field("key", &"***")
            .finish()
    }
}

// RFC 9110 token characters.
fn is_header_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
