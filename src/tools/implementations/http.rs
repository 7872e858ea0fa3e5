//! HTTP tool handler
//!
//! - GET when there are no parameters, POST with a JSON body otherwise
//! - Auth headers from the tool's `AuthConfig`
//! - Status classification: 2xx success, anything else an error carrying
//!   the status and raw body
//! - Body parsed as JSON, falling back to raw text

use crate::errors::{Result, ToolError};
use crate::tools::auth;
use crate::tools::types::{parse_http_endpoint, ExecutionParams, InvocationOutput, ToolDescriptor};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Request};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default connect timeout (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP handler shared by REST tools and HTTP-backed query services
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    /// Create handler with the default connect timeout
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_CONNECT_TIMEOUT, None)
    }

    /// Create handler with custom connect timeout and user agent
    pub fn with_config(connect_timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(connect_timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| ToolError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Build the outbound request for one call
    pub fn build_request(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<Request> {
        let url = parse_http_endpoint(&tool.endpoint)?;

        let builder = if params.is_empty() {
            self.client.request(Method::GET, url)
        } else {
            let body = serde_json::to_vec(params)?;
            self.client
                .request(Method::POST, url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body)
        };

        auth::authenticate(builder, &tool.auth)?
            .build()
            .map_err(|e| ToolError::Validation(format!("Failed to build request: {}", e)))
    }

    /// Send one request and classify the response
    pub async fn call(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<InvocationOutput> {
        let request = self.build_request(tool, params)?;
        debug!(
            method = %request.method(),
            url = %request.url(),
            auth = tool.auth.scheme(),
            "Sending tool request"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ToolError::Transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Transport(describe_transport_error(&e)))?;

        if (200..300).contains(&status) {
            Ok(InvocationOutput::http(parse_body(&body), status))
        } else {
            warn!(status, tool = %tool.name, "Tool endpoint returned non-success status");
            Err(ToolError::from_status(status, body))
        }
    }

    /// One authenticated GET with its own time bound, for connectivity checks
    pub async fn probe(&self, tool: &ToolDescriptor, timeout: Duration) -> Result<u16> {
        let url = parse_http_endpoint(&tool.endpoint)?;
        let builder = self.client.request(Method::GET, url).timeout(timeout);
        let response = auth::authenticate(builder, &tool.auth)?
            .send()
            .await
            .map_err(|e| ToolError::Transport(describe_transport_error(&e)))?;
        Ok(response.status().as_u16())
    }
}

/// Interpret a response body: empty → null, JSON → value, else raw text
pub fn parse_body(body: &str) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        format!("connection failed: {}", err)
    } else if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{AuthConfig, ToolKind};
    use serde_json::json;

    fn tool() -> ToolDescriptor {
        ToolDescriptor::new("t", "echo", ToolKind::RestApi, "http://127.0.0.1:9/echo")
            .with_auth(AuthConfig::ApiKey { key: "secret".into() })
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"ok\":true}"), json!({"ok": true}));
        assert_eq!(parse_body("[1,2]"), json!([1, 2]));
        assert_eq!(parse_body("plain text"), json!("plain text"));
    }

    #[test]
    fn test_get_when_params_empty() {
        let handler = HttpHandler::new().unwrap();
        let request = handler.build_request(&tool(), &ExecutionParams::new()).unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert!(request.body().is_none());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(request.headers()["x-api-key"], "secret");
    }

    #[test]
    fn test_post_with_json_body() {
        let handler = HttpHandler::new().unwrap();
        let mut params = ExecutionParams::new();
        params.insert("city".into(), json!("Oslo"));

        let request = handler.build_request(&tool(), &params).unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let sent: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(sent, json!({"city": "Oslo"}));
    }

    #[test]
    fn test_invalid_endpoint_is_validation_error() {
        let handler = HttpHandler::new().unwrap();
        let bad = ToolDescriptor::new("t", "bad", ToolKind::RestApi, "::not-a-url");
        let result = handler.build_request(&bad, &ExecutionParams::new());
        assert!(matches!(result, Err(ToolError::Validation(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let handler = HttpHandler::with_config(Duration::from_millis(500), None).unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let closed = ToolDescriptor::new("t", "closed", ToolKind::RestApi, format!("http://{}/", addr));
        let result = handler.call(&closed, &ExecutionParams::new()).await;
        assert!(matches!(result, Err(ToolError::Transport(_))));
    }
}
