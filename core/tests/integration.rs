//! End-to-end calls against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread
//! and talks to it through the default ureq transport, so request building,
//! the wire format and response parsing are all exercised together.

use std::collections::HashMap;

use quickapi_core::schema::{converters, validators};
use quickapi_core::{
    Api, ApiError, BasicAuth, BearerToken, Convention, FieldKind, FieldSpec, HeaderApiKey,
    HttpMethod, NoContent, QueryApiKey, Schema, SchemaAdapter, SchemaDescriptor, UreqTransport,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
struct Fact {
    fact: String,
    length: u32,
}

impl Schema for Fact {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ResponseBody {
    current_page: u32,
    data: Vec<Fact>,
}

impl Schema for ResponseBody {
    fn convention() -> Convention {
        Convention::model::<Self>()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RequestParams {
    max_length: Option<u32>,
    limit: Option<u32>,
}

impl Schema for RequestParams {
    fn convention() -> Convention {
        Convention::Validated(
            SchemaDescriptor::new()
                .field(FieldSpec::new("max_length", FieldKind::Integer).optional().default(100))
                .field(FieldSpec::new("limit", FieldKind::Integer).optional().default(10)),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct RequestBody {
    required_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    optional_input: Option<String>,
}

impl Schema for RequestBody {
    fn convention() -> Convention {
        Convention::model::<Self>()
    }
}

/// What `/echo` saw.
#[derive(Debug, Serialize, Deserialize)]
struct Echo {
    method: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    body: Value,
}

impl Schema for Echo {}

#[derive(Debug, Serialize, Deserialize)]
struct StatusFlag {
    success: bool,
}

impl Schema for StatusFlag {
    fn convention() -> Convention {
        Convention::Validated(SchemaDescriptor::new().field(
            FieldSpec::new("success", FieldKind::Bool).convert(converters::to_bool()),
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Authenticated {
    authenticated: bool,
}

impl Schema for Authenticated {}

#[test]
fn get_without_params_parses_the_page() {
    let base = start_server();
    let api = Api::<ResponseBody>::builder()
        .url(format!("{base}/facts"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let request = api.build_request(None, None).unwrap();
    assert!(request.query.is_empty());

    let response = api.execute(None, None, None).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body.current_page, 1);
    assert_eq!(response.body.data[0].fact, mock_server::SEED_FACTS[0]);
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[test]
fn params_are_sent_in_declared_order() {
    let base = start_server();
    let api = Api::<Echo>::builder()
        .url(format!("{base}/echo"))
        .request_params::<RequestParams>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let params = RequestParams {
        max_length: Some(5),
        limit: Some(10),
    };
    let echo = api.execute(Some(params), None, None).unwrap().body;
    assert_eq!(
        echo.query,
        vec![
            ("max_length".to_string(), "5".to_string()),
            ("limit".to_string(), "10".to_string()),
        ]
    );

    // Unset optionals stay off the wire.
    let echo = api.execute(None, None, None).unwrap().body;
    assert!(echo.query.is_empty());
}

#[test]
fn params_filter_the_facts() {
    let base = start_server();
    let api = Api::<ResponseBody>::builder()
        .url(format!("{base}/facts"))
        .request_params::<RequestParams>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let params = RequestParams {
        max_length: Some(40),
        limit: Some(1),
    };
    let page = api.execute(Some(params), None, None).unwrap().body;
    assert_eq!(page.data.len(), 1);
    assert!(page.data[0].length <= 40);
}

#[test]
fn missing_required_body_field_fails_before_sending() {
    // Nothing listens on port 9; reaching the network would be a transport
    // error instead.
    let api = Api::<Echo>::builder()
        .url("http://127.0.0.1:9/echo")
        .method(HttpMethod::Post)
        .request_body::<RequestBody>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let err = api.execute(None, None, None).unwrap_err();
    assert!(matches!(
        err,
        ApiError::MissingRequiredField { ref field, .. } if field == "required_input"
    ));
    assert!(err.is_request_error());

    let mut partial = Map::new();
    partial.insert("optional_input".to_string(), json!("x"));
    let err = SchemaAdapter::<RequestBody>::new()
        .construct(partial)
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingRequiredField { .. }));
}

#[derive(Debug, Serialize, Deserialize)]
struct BoundedParams {
    limit: Option<u32>,
}

impl Schema for BoundedParams {
    fn convention() -> Convention {
        Convention::Validated(SchemaDescriptor::new().field(
            FieldSpec::new("limit", FieldKind::Integer)
                .optional()
                .validate(validators::lt(100)),
        ))
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct BoundedBody {
    #[schemars(range(max = 99))]
    limit: u32,
}

impl Schema for BoundedBody {
    fn convention() -> Convention {
        Convention::model::<Self>()
    }
}

#[test]
fn invalid_params_fail_before_sending() {
    let api = Api::<Echo>::builder()
        .url("http://127.0.0.1:9/echo")
        .request_params::<BoundedParams>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let err = api
        .execute(Some(BoundedParams { limit: Some(500) }), None, None)
        .unwrap_err();
    match err {
        ApiError::Validation(ref v) => {
            assert_eq!(v.type_name, "BoundedParams");
            assert_eq!(v.field.as_deref(), Some("limit"));
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_model_body_fails_before_sending() {
    let api = Api::<Echo>::builder()
        .url("http://127.0.0.1:9/echo")
        .method(HttpMethod::Post)
        .request_body::<BoundedBody>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let err = api
        .execute(None, Some(BoundedBody { limit: 500 }), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ref v) if v.field.as_deref() == Some("limit")
    ));
}

#[test]
fn body_is_posted_as_json_without_unset_fields() {
    let base = start_server();
    let api = Api::<Echo>::builder()
        .url(format!("{base}/echo"))
        .method(HttpMethod::Post)
        .request_body::<RequestBody>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    let body = RequestBody {
        required_input: "hello".to_string(),
        optional_input: None,
    };
    let echo = api.execute(None, Some(body), None).unwrap().body;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, json!({"required_input": "hello"}));
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["accept"], "application/json");
    assert!(echo.headers["user-agent"].starts_with("quickapi/"));
}

#[test]
fn created_fact_round_trips() {
    let base = start_server();

    #[derive(Debug, Serialize, Deserialize)]
    struct NewFact {
        fact: String,
    }
    impl Schema for NewFact {}

    let api = Api::<Fact>::builder()
        .url(format!("{base}/facts"))
        .method(HttpMethod::Post)
        .request_body::<NewFact>()
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let response = api
        .execute(
            None,
            Some(NewFact {
                fact: "Cats purr.".to_string(),
            }),
            None,
        )
        .unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(
        response.body,
        Fact {
            fact: "Cats purr.".to_string(),
            length: 10
        }
    );
}

#[test]
fn error_status_exposes_the_decoded_payload() {
    let base = start_server();
    let api = Api::<Echo>::builder()
        .url(format!("{base}/status/401"))
        .method(HttpMethod::Post)
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    match api.execute(None, None, None).unwrap_err() {
        ApiError::HttpStatus {
            status, payload, ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(payload, Some(json!({"error": "unauthorized"})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn server_errors_are_http_status_errors() {
    let base = start_server();
    let api = Api::<Echo>::builder()
        .url(format!("{base}/status/503"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let err = api.execute(None, None, None).unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[test]
fn non_json_success_is_malformed() {
    let base = start_server();
    let api = Api::<ResponseBody>::builder()
        .url(format!("{base}/malformed"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let err = api.execute(None, None, None).unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse { .. }));
}

#[test]
fn string_boolean_is_converted() {
    let base = start_server();
    let api = Api::<StatusFlag>::builder()
        .url(format!("{base}/status-flag"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let flag = api.execute(None, None, None).unwrap().body;
    assert!(flag.success);
}

#[test]
fn no_content_responses() {
    let base = start_server();
    let api = Api::<NoContent>::builder()
        .url(format!("{base}/status/204"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let response = api.execute(None, None, None).unwrap();
    assert_eq!(response.status, 204);
    assert!(response.raw_body.is_empty());
}

#[test]
fn default_auth_and_call_override() {
    let base = start_server();
    let api = Api::<Authenticated>::builder()
        .url(format!("{base}/basic-auth/user/pass"))
        .auth(BasicAuth::new("user", "pass"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();

    assert!(api.execute(None, None, None).unwrap().body.authenticated);

    let wrong = BasicAuth::new("user", "nope");
    let err = api.execute(None, None, Some(&wrong)).unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn bearer_and_api_key_providers() {
    let base = start_server();

    let bearer = Api::<Authenticated>::builder()
        .url(format!("{base}/bearer"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    assert_eq!(bearer.execute(None, None, None).unwrap_err().status(), Some(401));
    let token = BearerToken::new("abc");
    assert!(bearer.execute(None, None, Some(&token)).unwrap().body.authenticated);

    let api_key = Api::<Authenticated>::builder()
        .url(format!("{base}/api-key"))
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let header = HeaderApiKey::new("x-api-key", "k1");
    assert!(api_key.execute(None, None, Some(&header)).unwrap().body.authenticated);
    let query = QueryApiKey::new("key", "k2");
    assert!(api_key.execute(None, None, Some(&query)).unwrap().body.authenticated);
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let api = Api::<Echo>::builder()
        .url("http://127.0.0.1:9/echo")
        .transport(UreqTransport::new())
        .build()
        .unwrap();
    let err = api.execute(None, None, None).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(!err.is_request_error());
}

#[cfg(feature = "reqwest")]
#[test]
fn reqwest_transport_matches_ureq() {
    let base = start_server();
    let api = Api::<Echo>::builder()
        .url(format!("{base}/echo"))
        .method(HttpMethod::Post)
        .request_params::<RequestParams>()
        .request_body::<RequestBody>()
        .transport(quickapi_core::ReqwestTransport::new().unwrap())
        .build()
        .unwrap();

    let echo = api
        .execute(
            Some(RequestParams {
                max_length: Some(5),
                limit: None,
            }),
            Some(RequestBody {
                required_input: "hi".to_string(),
                optional_input: Some("there".to_string()),
            }),
            None,
        )
        .unwrap()
        .body;
    assert_eq!(echo.query, vec![("max_length".to_string(), "5".to_string())]);
    assert_eq!(echo.body, json!({"required_input": "hi", "optional_input": "there"}));
}
