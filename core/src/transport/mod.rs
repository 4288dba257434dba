//! Pluggable HTTP backends.
//!
//! # Design
//! A [`Transport`] turns an `HttpRequest` into an `HttpResponse` and nothing
//! else: status interpretation and decoding stay in the response parser, so
//! 4xx/5xx answers come back as data. Backend failures (DNS, connect,
//! timeout, protocol) are wrapped in `ApiError::Transport`.
//!
//! Two blocking backends ship with the crate: [`UreqTransport`] (default)
//! and `ReqwestTransport` behind the `reqwest` feature.

use std::fmt;
use std::time::Duration;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

#[cfg(feature = "reqwest")]
mod reqwest_transport;
mod ureq_transport;

#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use ureq_transport::UreqTransport;

pub trait Transport: fmt::Debug + Send + Sync {
    /// Performs one round trip. `auth`, when given, is applied to the request
    /// before it goes on the wire.
    fn send(&self, request: HttpRequest, auth: Option<&dyn Auth>) -> Result<HttpResponse, ApiError>;
}

/// Applies `auth` to `request`, if any.
pub fn authorize(mut request: HttpRequest, auth: Option<&dyn Auth>) -> Result<HttpRequest, ApiError> {
    if let Some(auth) = auth {
        auth.apply(&mut request)?;
    }
    Ok(request)
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const TIMEOUT_ENV: &str = "QUICKAPI_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "QUICKAPI_USER_AGENT";

/// Settings shared by the built-in transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request timeout, from connect to the last body byte.
    pub timeout: Duration,
    pub user_agent: String,
    /// Headers added to every request unless the request sets them itself.
    pub default_headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("quickapi/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: Vec::new(),
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `QUICKAPI_TIMEOUT_SECS` and
    /// `QUICKAPI_USER_AGENT` when set.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::setup("transport", format!("{TIMEOUT_ENV}=`{raw}` is not a number of seconds"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = lookup(USER_AGENT_ENV).filter(|ua| !ua.trim().is_empty()) {
            config.user_agent = user_agent;
        }
        Ok(config)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Headers to put on the wire: the configured user agent, default
    /// headers, then the request's own. Later sources win on
    /// (case-insensitive) name clashes, and each name appears once.
    pub(crate) fn merged_headers(&self, request: &HttpRequest) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .filter(|(name, _)| request.header(name).is_none())
            .cloned()
            .collect();
        headers.extend(request.headers.iter().cloned());
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("user-agent")) {
            headers.insert(0, ("user-agent".to_string(), self.user_agent.clone()));
        }
        headers
    }
}
