//! API definitions: a declared endpoint plus the call that executes it.
//!
//! # Design
//! `ApiBuilder` collects the declaration (URL, method, params/body/response
//! types, transport, default auth) and validates it once in `build`. The
//! result is an immutable `ApiConfig` behind an `Arc`; `Api` is a handle to
//! it, cheap to clone and safe to share across threads. Every `execute`
//! builds a fresh request, so calls never see each other's state.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument, warn, Span};
use url::Url;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::request::RequestTemplate;
use crate::response::{parse_response, ApiResponse};
use crate::schema::{Schema, SchemaAdapter};
use crate::transport::{Transport, TransportConfig, UreqTransport};
use crate::types::{NoBody, NoParams};

struct ApiConfig<R, P, B> {
    request: RequestTemplate<P, B>,
    response: SchemaAdapter<R>,
    transport: Arc<dyn Transport>,
    auth: Option<Arc<dyn Auth>>,
}

/// A declared HTTP endpoint returning `R`, taking query params `P` and a
/// JSON body `B`.
///
/// ```rust,no_run
/// use quickapi_core::{Api, HttpMethod, Schema};
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Fact {
///     fact: String,
///     length: u32,
/// }
/// impl Schema for Fact {}
///
/// let api = Api::<Fact>::builder()
///     .url("https://catfact.ninja/fact")
///     .method(HttpMethod::Get)
///     .build()?;
/// let fact = api.execute(None, None, None)?.body;
/// println!("{}", fact.fact);
/// # Ok::<(), quickapi_core::ApiError>(())
/// ```
pub struct Api<R, P = NoParams, B = NoBody> {
    config: Arc<ApiConfig<R, P, B>>,
}

impl<R: Schema> Api<R> {
    pub fn builder() -> ApiBuilder<R> {
        ApiBuilder::new()
    }
}

impl<R: Schema, P: Schema, B: Schema> Api<R, P, B> {
    pub fn url(&self) -> &str {
        &self.config.request.url
    }

    pub fn method(&self) -> HttpMethod {
        self.config.request.method
    }

    pub fn has_request_params(&self) -> bool {
        self.config.request.params.is_some()
    }

    pub fn has_request_body(&self) -> bool {
        self.config.request.body.is_some()
    }

    /// The request `execute` would send for these inputs, before any
    /// credentials are applied. Performs no I/O.
    pub fn build_request(&self, params: Option<&P>, body: Option<&B>) -> Result<HttpRequest, ApiError> {
        self.config.request.build(params, body)
    }

    /// Performs the call.
    ///
    /// `params` and `body` fall back to instances built from the declared
    /// defaults. `auth` overrides the credential configured on the builder.
    pub fn execute(
        &self,
        params: Option<P>,
        body: Option<B>,
        auth: Option<&dyn Auth>,
    ) -> Result<ApiResponse<R>, ApiError> {
        self.execute_with(self.config.transport.as_ref(), params, body, auth)
    }

    /// Performs the call through `transport` instead of the configured one.
    #[instrument(
        name = "api_request",
        skip_all,
        fields(
            http.method = %self.config.request.method,
            http.url = %self.config.request.url,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub fn execute_with(
        &self,
        transport: &dyn Transport,
        params: Option<P>,
        body: Option<B>,
        auth: Option<&dyn Auth>,
    ) -> Result<ApiResponse<R>, ApiError> {
        let request = self.build_request(params.as_ref(), body.as_ref())?;
        debug!(
            query_params = request.query.len(),
            has_body = request.body.is_some(),
            "request built"
        );

        let auth = auth.or(self.config.auth.as_deref());
        let response = transport.send(request, auth).inspect_err(|e| {
            Span::current().record("otel.status_code", "ERROR");
            warn!(error = %e, "transport failed");
        })?;

        Span::current().record("http.status_code", response.status);
        if response.is_error() {
            let otel_status = if response.status >= 500 { "ERROR" } else { "UNSET" };
            Span::current().record("otel.status_code", otel_status);
            warn!(status = response.status, "error status");
        } else {
            Span::current().record("otel.status_code", "OK");
        }

        parse_response(&self.config.response, response).inspect_err(|e| {
            if !matches!(e, ApiError::HttpStatus { .. }) {
                warn!(error = %e, "response rejected");
            }
        })
    }
}

impl<R, P, B> Clone for Api<R, P, B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<R, P, B> fmt::Debug for Api<R, P, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("url", &self.config.request.url)
            .field("method", &self.config.request.method)
            .field("request_params", &self.config.request.params)
            .field("request_body", &self.config.request.body)
            .field("response_body", &self.config.response)
            .field("transport", &self.config.transport)
            .field("auth", &self.config.auth)
            .finish()
    }
}

/// Declaration of an [`Api`]. Only the URL is mandatory.
pub struct ApiBuilder<R, P = NoParams, B = NoBody> {
    url: Option<String>,
    method: Result<HttpMethod, String>,
    params: bool,
    body: bool,
    transport: Option<Arc<dyn Transport>>,
    auth: Option<Arc<dyn Auth>>,
    _marker: PhantomData<fn() -> (R, P, B)>,
}

impl<R: Schema> ApiBuilder<R> {
    fn new() -> Self {
        Self {
            url: None,
            method: Ok(HttpMethod::default()),
            params: false,
            body: false,
            transport: None,
            auth: None,
            _marker: PhantomData,
        }
    }
}

impl<R: Schema, P: Schema, B: Schema> ApiBuilder<R, P, B> {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Ok(method);
        self
    }

    /// Method given by name, case-insensitive. Unknown names are reported
    /// by `build`.
    pub fn method_name(mut self, name: &str) -> Self {
        self.method = name.parse().map_err(|_| name.to_string());
        self
    }

    /// Declares the query params type.
    pub fn request_params<Q: Schema>(self) -> ApiBuilder<R, Q, B> {
        ApiBuilder {
            url: self.url,
            method: self.method,
            params: true,
            body: self.body,
            transport: self.transport,
            auth: self.auth,
            _marker: PhantomData,
        }
    }

    /// Declares the JSON body type.
    pub fn request_body<C: Schema>(self) -> ApiBuilder<R, P, C> {
        ApiBuilder {
            url: self.url,
            method: self.method,
            params: self.params,
            body: true,
            transport: self.transport,
            auth: self.auth,
            _marker: PhantomData,
        }
    }

    /// Backend used for the calls. Defaults to a [`UreqTransport`]
    /// configured from the environment.
    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Like [`transport`](Self::transport), sharing one backend between
    /// several APIs.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Credential applied to every call that does not pass its own.
    pub fn auth(mut self, auth: impl Auth + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn build(self) -> Result<Api<R, P, B>, ApiError> {
        let url = self
            .url
            .ok_or_else(|| ApiError::setup("url", "is required"))?;
        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ApiError::setup(
                    "url",
                    format!("has unsupported scheme `{}`", parsed.scheme()),
                ))
            }
            Err(e) => return Err(ApiError::setup("url", format!("is not an absolute URL: {e}"))),
        }

        let method = self.method.map_err(|name| {
            ApiError::setup("method", format!("`{name}` is not a supported HTTP method"))
        })?;
        if self.body && !method.allows_body() {
            return Err(ApiError::setup(
                "request_body",
                format!("cannot be sent with {method}"),
            ));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::with_config(TransportConfig::from_env()?)),
        };

        let config = ApiConfig {
            request: RequestTemplate {
                url,
                method,
                params: self.params.then(SchemaAdapter::new),
                body: self.body.then(SchemaAdapter::new),
            },
            response: SchemaAdapter::new(),
            transport,
            auth: self.auth,
        };
        debug!(
            url = %config.request.url,
            method = %method,
            response = config.response.type_name(),
            "api defined"
        );
        Ok(Api {
            config: Arc::new(config),
        })
    }
}
