//! Single-attempt tool invocation
//!
//! The invoker performs exactly one attempt: validate the descriptor, pick
//! the handler for the tool's kind, run it, and classify the outcome. It has
//! no retry, timeout or breaker logic; those live in the executor.

use crate::errors::{Result, ToolError};
use crate::tools::implementations::database::{is_http_query_service, QueryBackend};
use crate::tools::implementations::{FunctionRegistry, HttpHandler};
use crate::tools::types::{ExecutionParams, InvocationOutput, ToolDescriptor, ToolExecutionResult, ToolKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One attempt of one tool call
#[async_trait]
pub trait Invoke: Send + Sync {
    async fn attempt(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<InvocationOutput>;
}

/// Default invoker dispatching on `ToolKind`
#[derive(Clone)]
pub struct Invoker {
    http: HttpHandler,
    functions: FunctionRegistry,
    database: Option<Arc<dyn QueryBackend>>,
}

impl Invoker {
    /// Create invoker with default HTTP settings
    pub fn new() -> Result<Self> {
        Ok(Self::with_http(HttpHandler::new()?))
    }

    /// Create invoker around a configured HTTP handler
    pub fn with_http(http: HttpHandler) -> Self {
        Self {
            http,
            functions: FunctionRegistry::new(),
            database: None,
        }
    }

    /// Create invoker with a custom connect timeout
    pub fn with_connect_timeout(connect_timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        Ok(Self::with_http(HttpHandler::with_config(connect_timeout, user_agent)?))
    }

    /// Set in-process function handlers
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Set database backend
    pub fn with_database(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.database = Some(backend);
        self
    }

    /// HTTP handler (shared with connectivity checks)
    pub fn http(&self) -> &HttpHandler {
        &self.http
    }

    /// Run one attempt and fold the outcome into a result. Never fails for
    /// network or HTTP errors.
    pub async fn invoke(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> ToolExecutionResult {
        let start = Instant::now();
        let outcome = self.attempt(tool, params).await;
        ToolExecutionResult::from_outcome(tool, outcome, start.elapsed())
            .with_metadata("attempts", Value::from(1u32))
    }

    async fn query(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<InvocationOutput> {
        if let Some(backend) = &self.database {
            return backend.query(tool, params).await.map(InvocationOutput::local);
        }
        if is_http_query_service(tool) {
            return self.http.call(tool, params).await;
        }
        Err(ToolError::Validation(format!(
            "No database backend configured for tool {}",
            tool.id
        )))
    }
}

#[async_trait]
impl Invoke for Invoker {
    async fn attempt(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> Result<InvocationOutput> {
        tool.validate()?;

        match tool.kind {
            ToolKind::RestApi => self.http.call(tool, params).await,
            ToolKind::Function => self
                .functions
                .call(tool.endpoint.trim(), params)
                .await
                .map(InvocationOutput::local),
            ToolKind::Database => self.query(tool, params).await,
        }
    }
}
