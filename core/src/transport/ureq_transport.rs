use ::ureq::http;
use ::ureq::Agent;
use tracing::debug;

use super::{authorize, Transport, TransportConfig};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Blocking transport backed by a `ureq` agent. The agent, and with it the
/// connection pool, is shared by clones.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        // Status codes are interpreted by the response parser, not here.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn method(method: HttpMethod) -> http::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Put => http::Method::PUT,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Delete => http::Method::DELETE,
        HttpMethod::Head => http::Method::HEAD,
        HttpMethod::Options => http::Method::OPTIONS,
        HttpMethod::Trace => http::Method::TRACE,
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest, auth: Option<&dyn Auth>) -> Result<HttpResponse, ApiError> {
        let request = authorize(request, auth)?;
        let url = request.full_url()?;
        debug!(method = %request.method, url = %url, backend = "ureq", "sending request");

        let mut builder = http::Request::builder()
            .method(method(request.method))
            .uri(url.as_str());
        for (name, value) in self.config.merged_headers(&request) {
            builder = builder.header(name, value);
        }

        let result = match request.body {
            Some(body) => {
                let request = builder.body(body.to_vec()).map_err(ApiError::transport)?;
                self.agent.run(request)
            }
            None => {
                let request = builder.body(()).map_err(ApiError::transport)?;
                self.agent.run(request)
            }
        };
        let mut response = result.map_err(ApiError::transport)?;

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
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(ApiError::transport)?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.into(),
        })
    }
}
