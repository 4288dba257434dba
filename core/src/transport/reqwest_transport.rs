use ::reqwest::blocking::Client;
use ::reqwest::Method;
use tracing::debug;

use super::{authorize, Transport, TransportConfig};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Blocking transport backed by `reqwest`.
///
/// Must not be created or used from inside an async runtime; reqwest's
/// blocking client starts its own.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ApiError::transport)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Trace => Method::TRACE,
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest, auth: Option<&dyn Auth>) -> Result<HttpResponse, ApiError> {
        let request = authorize(request, auth)?;
        let url = request.full_url()?;
        debug!(method = %request.method, url = %url, backend = "reqwest", "sending request");

        let mut builder = self.client.request(method(request.method), url);
        for (name, value) in self.config.merged_headers(&request) {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().map_err(ApiError::transport)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().map_err(ApiError::transport)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
