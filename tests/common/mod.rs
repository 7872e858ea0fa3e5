//! Shared helpers for integration tests: a local axum server with
//! canned endpoints and hit counters.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Running test server
pub struct TestServer {
    pub base: String,
    pub failures: Arc<AtomicUsize>,
    pub flaky: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn failure_hits(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn flaky_hits(&self) -> usize {
        self.flaky.load(Ordering::SeqCst)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::from(String::from_utf8_lossy(&body).to_string()))
    };
    Json(json!({
        "method": method.as_str(),
        "body": body,
        "authorization": header(&headers, "authorization"),
        "x_api_key": header(&headers, "x-api-key"),
        "content_type": header(&headers, "content-type"),
    }))
}

/// Spawn a server on port 0 (random available port)
pub async fn spawn_test_server() -> TestServer {
    let failures = Arc::new(AtomicUsize::new(0));
    let flaky = Arc::new(AtomicUsize::new(0));

    let failures_handle = failures.clone();
    let flaky_handle = flaky.clone();

    let app = Router::new()
        .route("/json", get(|| async { Json(json!({"temp": 21, "unit": "C"})) }))
        .route("/text", get(|| async { "sunny and warm" }))
        .route("/empty", get(|| async { StatusCode::OK }))
        .route("/echo", any(echo))
        .route(
            "/fail",
            any(move || {
                let hits = failures_handle.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
                }
            }),
        )
        .route(
            "/flaky",
            any(move || {
                let hits = flaky_handle.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        (StatusCode::SERVICE_UNAVAILABLE, "try later".to_string()).into_response()
                    } else {
                        Json(json!({"attempt": n})).into_response()
                    }
                }
            }),
        )
        .route("/denied", any(|| async { (StatusCode::UNAUTHORIZED, "bad credentials") }))
        .route("/forbidden", any(|| async { (StatusCode::FORBIDDEN, "no access") }))
        .route("/missing", any(|| async { (StatusCode::NOT_FOUND, "no such thing") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        failures,
        flaky,
    }
}
