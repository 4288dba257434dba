//! A small "cat facts" HTTP API used to exercise `quickapi-core` end to end.
//!
//! Routes:
//! - `GET /facts?max_length&limit`: a page of facts
//! - `POST /facts`: add a fact, `201` with the stored fact
//! - `DELETE /facts/{index}`: `204`, or `404` for unknown indices
//! - `GET /fact`: the first fact
//! - `GET /status-flag`: a payload whose boolean is sent as a string
//! - `GET /basic-auth/{user}/{password}`: `200` when basic credentials match
//! - `GET /bearer`: `200` when a bearer token is present
//! - `GET /api-key`: `200` when `x-api-key` or `?key=` is present
//! - `ANY /status/{code}`: answers with `code` and `{"error": reason}`
//! - `GET /malformed`: `200` with a body that is not JSON
//! - `ANY /echo`: reflects method, query, headers and JSON body

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, delete, get},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub fact: String,
    pub length: usize,
}

impl Fact {
    fn new(fact: &str) -> Self {
        Self {
            fact: fact.to_string(),
            length: fact.chars().count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactPage {
    pub current_page: u32,
    pub data: Vec<Fact>,
}

#[derive(Debug, Deserialize)]
pub struct FactQuery {
    pub max_length: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NewFact {
    pub fact: String,
}

pub const SEED_FACTS: &[&str] = &[
    "Cats sleep 70% of their lives.",
    "A group of cats is called a clowder.",
    "Cats have five toes on their front paws, but only four on the back.",
    "The oldest known pet cat existed 9,500 years ago.",
    "A cat's nose print is unique, much like a human fingerprint.",
];

pub const DEFAULT_LIMIT: usize = 10;

pub type Db = Arc<RwLock<Vec<Fact>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(SEED_FACTS.iter().map(|f| Fact::new(f)).collect()));
    Router::new()
        .route("/facts", get(list_facts).post(create_fact))
        .route("/facts/{index}", delete(delete_fact))
        .route("/fact", get(first_fact))
        .route("/status-flag", get(status_flag))
        .route("/basic-auth/{user}/{password}", get(basic_auth))
        .route("/bearer", get(bearer))
        .route("/api-key", get(api_key))
        .route("/status/{code}", any(status))
        .route("/malformed", get(malformed))
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn list_facts(State(db): State<Db>, Query(query): Query<FactQuery>) -> Json<FactPage> {
    debug!(?query, "listing facts");
    let facts = db.read().await;
    let data = facts
        .iter()
        .filter(|f| query.max_length.map_or(true, |max| f.length <= max))
        .take(query.limit.unwrap_or(DEFAULT_LIMIT))
        .cloned()
        .collect();
    Json(FactPage {
        current_page: 1,
        data,
    })
}

async fn create_fact(State(db): State<Db>, Json(input): Json<NewFact>) -> (StatusCode, Json<Fact>) {
    let fact = Fact::new(&input.fact);
    db.write().await.push(fact.clone());
    (StatusCode::CREATED, Json(fact))
}

async fn delete_fact(State(db): State<Db>, Path(index): Path<usize>) -> StatusCode {
    let mut facts = db.write().await;
    if index < facts.len() {
        facts.remove(index);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn first_fact(State(db): State<Db>) -> Result<Json<Fact>, Response> {
    let facts = db.read().await;
    facts
        .first()
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND))
}

async fn status_flag() -> Json<Value> {
    Json(json!({"success": "true"}))
}

async fn basic_auth(Path((user, password)): Path<(String, String)>, headers: HeaderMap) -> Response {
    let expected = format!("{user}:{password}");
    let provided = authorization(&headers)
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());
    match provided {
        Some(credentials) if credentials == expected => {
            Json(json!({"authenticated": true, "user": user})).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED),
    }
}

async fn bearer(headers: HeaderMap) -> Response {
    match authorization(&headers).and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => {
            Json(json!({"authenticated": true, "token": token})).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED),
    }
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

async fn api_key(headers: HeaderMap, Query(query): Query<KeyQuery>) -> Response {
    let from_header = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    match from_header.or(query.key) {
        Some(key) => Json(json!({"authenticated": true, "key": key})).into_response(),
        None => error(StatusCode::UNAUTHORIZED),
    }
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) if status.is_client_error() || status.is_server_error() => error(status),
        Ok(status) if status == StatusCode::NO_CONTENT => status.into_response(),
        Ok(status) => (status, Json(json!({"status": code}))).into_response(),
        Err(_) => error(StatusCode::BAD_REQUEST),
    }
}

async fn malformed() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "{not json",
    )
        .into_response()
}

async fn echo(
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "headers": headers,
        "body": body,
    }))
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn error(status: StatusCode) -> Response {
    let reason = status
        .canonical_reason()
        .unwrap_or("error")
        .to_ascii_lowercase();
    (status, Json(json!({"error": reason}))).into_response()
}
