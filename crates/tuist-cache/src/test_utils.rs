//! A local cloud cache server for tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::archiver::content_md5;

/// What the stub has seen and how it should misbehave.
#[derive(Debug, Default)]
pub struct StubState {
    pub base_url: String,
    /// Archives by hash.
    pub artifacts: HashMap<String, Vec<u8>>,
    /// Status answered to every `HEAD /api/cache`, instead of 200/404.
    pub head_status: Option<u16>,
    /// Hashes whose `GET /api/cache` answers 500.
    pub broken: HashSet<String>,
    /// Raw 200 body for `GET /api/cache`.
    pub fetch_body: Option<String>,
    /// `"<METHOD> <path>"` of every request, in order.
    pub requests: Vec<String>,
    pub analytics: Vec<Value>,
    /// Number of analytics posts to reject before accepting.
    pub analytics_failures: usize,
}

pub struct StubCloud {
    pub url: String,
    pub state: Arc<Mutex<StubState>>,
    server: tokio::task::JoinHandle<()>,
}

impl StubCloud {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(StubState {
            base_url: url.clone(),
            ..StubState::default()
        }));
        let app = create_router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        StubCloud { url, state, server }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }
}

impl Drop for StubCloud {
    fn drop(&mut self) {
        self.server.abort();
    }
}

type SharedState = Arc<Mutex<StubState>>;

fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/cache", get(fetch).head(exists).post(store))
        .route("/api/cache/verify_upload", post(verify_upload))
        .route("/upload/:hash", put(upload))
        .route("/download/:hash", get(download))
        .route("/api/analytics", post(analytics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CacheQuery {
    #[allow(dead_code)]
    project_id: String,
    hash: String,
    content_md5: Option<String>,
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({ "status": "error", "errors": [{ "code": code, "message": message }] });
    (status, Json(body)).into_response()
}

fn success(data: Value) -> Response {
    (StatusCode::OK, Json(json!({ "status": "success", "data": data }))).into_response()
}

async fn exists(State(state): State<SharedState>, Query(query): Query<CacheQuery>) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push("HEAD /api/cache".into());
    if let Some(status) = state.head_status {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    if state.artifacts.contains_key(&query.hash) {
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn fetch(State(state): State<SharedState>, Query(query): Query<CacheQuery>) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push("GET /api/cache".into());
    if let Some(body) = &state.fetch_body {
        return (StatusCode::OK, body.clone()).into_response();
    }
    if state.broken.contains(&query.hash) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Storage is unavailable");
    }
    if !state.artifacts.contains_key(&query.hash) {
        return error(StatusCode::NOT_FOUND, "not_found", "The artifact doesn't exist");
    }
    let url = format!("{}/download/{}", state.base_url, query.hash);
    success(json!({ "url": url, "expires_at": 0 }))
}

async fn store(State(state): State<SharedState>, Query(query): Query<CacheQuery>) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /api/cache".into());
    if query.content_md5.is_none() {
        return error(StatusCode::BAD_REQUEST, "missing_md5", "content_md5 is required");
    }
    let url = format!("{}/upload/{}", state.base_url, query.hash);
    success(json!({ "url": url, "expires_at": 0 }))
}

async fn upload(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    state.requests.push(format!("PUT /upload/{hash}"));
    let expected = headers.get("Content-MD5").and_then(|v| v.to_str().ok());
    if expected != Some(content_md5(&body).as_str()) {
        return StatusCode::BAD_REQUEST;
    }
    state.artifacts.insert(hash, body.to_vec());
    StatusCode::OK
}

async fn verify_upload(
    State(state): State<SharedState>,
    Query(query): Query<CacheQuery>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /api/cache/verify_upload".into());
    match state.artifacts.get(&query.hash) {
        Some(bytes) => success(json!({ "uploaded_size": bytes.len() })),
        None => error(StatusCode::NOT_FOUND, "not_found", "Nothing was uploaded"),
    }
}

async fn download(State(state): State<SharedState>, Path(hash): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(format!("GET /download/{hash}"));
    match state.artifacts.get(&hash) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn analytics(State(state): State<SharedState>, Json(event): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /api/analytics".into());
    if state.analytics_failures > 0 {
        state.analytics_failures -= 1;
        return error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "Try again later");
    }
    state.analytics.push(event);
    success(json!({}))
}
