//! Database query tools
//!
//! Queries go to an injected backend. Without one, a tool whose endpoint is
//! an http(s) URL is treated as a query service and reached over HTTP.

use crate::errors::Result;
use crate::tools::types::{ExecutionParams, ToolDescriptor};
use async_trait::async_trait;
use serde_json::Value;

/// Executes the query described by a `Database` tool
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<Value>;
}

/// Whether a database tool can be forwarded to an HTTP query service
pub fn is_http_query_service(tool: &ToolDescriptor) -> bool {
    let endpoint = tool.endpoint.trim_start();
    endpoint.starts_with("http://") || endpoint.starts_with("https://")
}
