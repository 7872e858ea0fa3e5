//! Invoker and auth behavior against a real local HTTP server.

mod common;

use common::spawn_test_server;
use serde_json::{json, Value};
use toolrelay::tools::{AuthConfig, ExecutionParams, Invoke, Invoker, ToolDescriptor, ToolKind};
use toolrelay::ToolError;

fn rest(id: &str, url: String) -> ToolDescriptor {
    ToolDescriptor::new(id, format!("{id}-tool"), ToolKind::RestApi, url)
}

fn params(value: Value) -> ExecutionParams {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

#[tokio::test]
async fn get_without_params_parses_json() {
    let server = spawn_test_server().await;
    let invoker = Invoker::new().unwrap();

    let output = invoker
        .attempt(&rest("w", server.url("/json")), &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.status, Some(200));
    assert_eq!(output.value, json!({"temp": 21, "unit": "C"}));
}

#[tokio::test]
async fn non_json_body_falls_back_to_text() {
    let server = spawn_test_server().await;
    let invoker = Invoker::new().unwrap();

    let output = invoker
        .attempt(&rest("t", server.url("/text")), &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.value, json!("sunny and warm"));
}

#[tokio::test]
async fn empty_body_is_null() {
    let server = spawn_test_server().await;
    let result = Invoker::new()
        .unwrap()
        .invoke(&rest("e", server.url("/empty")), &ExecutionParams::new())
        .await;

    assert!(result.success);
    assert_eq!(result.result, Some(Value::Null));
    assert_eq!(result.metadata["statusCode"], json!(200));
}

#[tokio::test]
async fn params_are_posted_as_json() {
    let server = spawn_test_server().await;
    let invoker = Invoker::new().unwrap();

    let output = invoker
        .attempt(&rest("p", server.url("/echo")), &params(json!({"city": "Oslo", "days": 2})))
        .await
        .unwrap();

    assert_eq!(output.value["method"], json!("POST"));
    assert_eq!(output.value["body"], json!({"city": "Oslo", "days": 2}));
    assert_eq!(output.value["content_type"], json!("application/json"));
    assert_eq!(output.value["authorization"], Value::Null);
}

#[tokio::test]
async fn empty_params_use_get() {
    let server = spawn_test_server().await;
    let output = Invoker::new()
        .unwrap()
        .attempt(&rest("g", server.url("/echo")), &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.value["method"], json!("GET"));
    assert_eq!(output.value["body"], Value::Null);
}

#[tokio::test]
async fn api_key_sends_bearer_and_key_headers() {
    let server = spawn_test_server().await;
    let tool = rest("k", server.url("/echo")).with_auth(AuthConfig::ApiKey { key: "s3cret".into() });

    let output = Invoker::new()
        .unwrap()
        .attempt(&tool, &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.value["authorization"], json!("Bearer s3cret"));
    assert_eq!(output.value["x_api_key"], json!("s3cret"));
}

#[tokio::test]
async fn basic_auth_encodes_credentials() {
    let server = spawn_test_server().await;
    let tool = rest("b", server.url("/echo")).with_auth(AuthConfig::Basic {
        username: "user".into(),
        password: "pass".into(),
    });

    let output = Invoker::new()
        .unwrap()
        .attempt(&tool, &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.value["authorization"], json!("Basic dXNlcjpwYXNz"));
    assert_eq!(output.value["x_api_key"], Value::Null);
}

#[tokio::test]
async fn oauth2_sends_static_bearer_token() {
    let server = spawn_test_server().await;
    let tool = rest("o", server.url("/echo")).with_auth(AuthConfig::OAuth2 { token: "tok-1".into() });

    let output = Invoker::new()
        .unwrap()
        .attempt(&tool, &ExecutionParams::new())
        .await
        .unwrap();

    assert_eq!(output.value["authorization"], json!("Bearer tok-1"));
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let server = spawn_test_server().await;
    let error = Invoker::new()
        .unwrap()
        .attempt(&rest("f", server.url("/fail")), &ExecutionParams::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ToolError::Server { status: 500, .. }));
    let message = error.to_string();
    assert!(message.contains("500"));
    assert!(message.contains("upstream exploded"));
    assert_eq!(server.failure_hits(), 1);
}

#[tokio::test]
async fn auth_and_client_errors_are_classified() {
    let server = spawn_test_server().await;
    let invoker = Invoker::new().unwrap();
    let none = ExecutionParams::new();

    let denied = invoker.attempt(&rest("d", server.url("/denied")), &none).await.unwrap_err();
    assert!(matches!(denied, ToolError::Auth { status: 401, .. }));

    let forbidden = invoker.attempt(&rest("x", server.url("/forbidden")), &none).await.unwrap_err();
    assert!(matches!(forbidden, ToolError::Auth { status: 403, .. }));

    let missing = invoker.attempt(&rest("m", server.url("/missing")), &none).await.unwrap_err();
    assert!(matches!(missing, ToolError::Client { status: 404, .. }));
    assert!(missing.to_string().contains("no such thing"));
}

#[tokio::test]
async fn database_tool_forwards_to_http_query_service() {
    let server = spawn_test_server().await;
    let tool = ToolDescriptor::new("db", "orders", ToolKind::Database, server.url("/echo"));

    let output = Invoker::new()
        .unwrap()
        .attempt(&tool, &params(json!({"sql": "select 1"})))
        .await
        .unwrap();

    assert_eq!(output.value["body"], json!({"sql": "select 1"}));
}

#[tokio::test]
async fn failed_result_metadata() {
    let server = spawn_test_server().await;
    let result = Invoker::new()
        .unwrap()
        .invoke(&rest("f", server.url("/fail")), &ExecutionParams::new())
        .await;

    assert!(!result.success);
    assert!(result.result.is_none());
    assert_eq!(result.metadata["statusCode"], json!(500));
    assert_eq!(result.metadata["errorKind"], json!("server"));
    assert_eq!(result.metadata["toolType"], json!("REST_API"));
}
