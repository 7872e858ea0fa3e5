//! Tool runtime coordinator
//!
//! Entry point used by the agent runtime and the CLI. Owns the registry,
//! the fault-tolerant executor (with its breaker table and telemetry) and
//! the chain orchestrator.

use crate::config::Config;
use crate::errors::{Result, ToolError};
use crate::telemetry::TelemetryCollector;
use crate::tools::executor::FaultTolerantExecutor;
use crate::tools::format::{
    format_error, format_execution_result, format_tool_info, format_tool_list, to_llm_string, ToolInfoEnvelope,
    ToolListEnvelope,
};
use crate::tools::implementations::HttpHandler;
use crate::tools::invoker::{Invoke, Invoker};
use crate::tools::orchestrator::ChainOrchestrator;
use crate::tools::params::{parse_parameters, parse_tool_id};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{Agent, ExecutionParams, ToolChainResult, ToolDescriptor, ToolExecutionResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Outcome of a connectivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCheck {
    pub valid: bool,
    pub message: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConnectionCheck {
    fn success(message: impl Into<String>, response_time: Duration, status: u16) -> Self {
        Self {
            valid: true,
            message: message.into(),
            response_time_ms: response_time.as_millis() as u64,
            status_code: Some(status),
            details: None,
        }
    }

    fn failure(message: impl Into<String>, details: impl Into<String>, response_time: Duration) -> Self {
        Self {
            valid: false,
            message: message.into(),
            response_time_ms: response_time.as_millis() as u64,
            status_code: None,
            details: Some(details.into()),
        }
    }
}

/// Tool runtime coordinator
pub struct ToolRuntime {
    /// Known tools and agent bindings
    registry: ToolRegistry,

    /// Chain orchestrator (owns the executor)
    orchestrator: ChainOrchestrator,

    /// HTTP handler for connectivity checks
    http: HttpHandler,

    /// Bound on a connectivity check
    check_timeout: Duration,
}

impl ToolRuntime {
    /// Create runtime with the default invoker configured from `config`
    pub fn new(config: &Config, registry: ToolRegistry) -> Result<Self> {
        let invoker = Invoker::with_connect_timeout(config.connect_timeout(), config.http.user_agent.as_deref())?;
        Ok(Self::with_invoker(config, registry, invoker))
    }

    /// Create runtime around a configured invoker (functions, database backend)
    pub fn with_invoker(config: &Config, registry: ToolRegistry, invoker: Invoker) -> Self {
        let http = invoker.http().clone();
        Self::from_parts(config, registry, Arc::new(invoker), http)
    }

    /// Create runtime around any single-attempt invoker
    pub fn from_parts(config: &Config, registry: ToolRegistry, invoker: Arc<dyn Invoke>, http: HttpHandler) -> Self {
        let executor = FaultTolerantExecutor::new(invoker)
            .with_retry(config.retry_policy())
            .with_attempt_timeout(config.attempt_timeout())
            .with_breaker_config(config.breaker_config());
        let orchestrator = ChainOrchestrator::new(executor).with_max_parallel(config.execution.max_parallel);

        Self {
            registry,
            orchestrator,
            http,
            check_timeout: config.check_timeout(),
        }
    }

    /// Execute one tool call
    pub async fn execute_one(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> ToolExecutionResult {
        self.executor().execute_with_retry(tool, params).await
    }

    /// Execute a registered tool by id
    pub async fn execute_by_id(&self, tool_id: &str, params: &ExecutionParams) -> Result<ToolExecutionResult> {
        let tool = self.registry.require(tool_id)?;
        Ok(self.execute_one(tool, params).await)
    }

    /// Execute a chain for an agent
    pub async fn execute_chain(&self, agent: &Agent, tool_ids: &[String], params: &ExecutionParams) -> ToolChainResult {
        self.orchestrator.execute_chain(agent, tool_ids, params).await
    }

    /// Execute a chain for a registered agent, or for the implicit agent bound
    /// to every tool when `agent_id` is `None`
    pub async fn execute_chain_for(
        &self,
        agent_id: Option<&str>,
        tool_ids: &[String],
        params: &ExecutionParams,
    ) -> Result<ToolChainResult> {
        let agent = match agent_id {
            Some(id) => self
                .registry
                .agent(id)
                .ok_or_else(|| ToolError::Validation(format!("Agent not found: {}", id)))?,
            None => self.registry.default_agent(),
        };
        Ok(self.execute_chain(&agent, tool_ids, params).await)
    }

    /// Model-facing entry point: tolerant id and parameter parsing, JSON
    /// string out. Never fails.
    pub async fn execute_for_model(&self, raw_tool_id: &str, raw_params: &str) -> String {
        let tool_id = match parse_tool_id(raw_tool_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(raw_tool_id, error = %e, "Rejected tool id from model");
                return to_llm_string(&format_error("Invalid input", &e.to_string()));
            }
        };

        let Some(tool) = self.registry.get(&tool_id) else {
            warn!(tool_id = %tool_id, "Model requested unknown tool");
            let error = ToolError::UnknownTool(tool_id);
            return to_llm_string(&format_error("Invalid input", &error.to_string()));
        };

        let params = parse_parameters(raw_params);
        info!(tool_id = %tool.id, tool_name = %tool.name, params = params.len(), "Executing tool for model");

        let result = self.execute_one(tool, &params).await;
        to_llm_string(&format_execution_result(&result))
    }

    /// Listing of tools visible to an organization
    pub fn list_tools(&self, organization_id: Option<&str>) -> ToolListEnvelope {
        format_tool_list(self.registry.list(organization_id), organization_id)
    }

    /// Detailed view of one tool
    pub fn tool_info(&self, raw_tool_id: &str) -> Result<ToolInfoEnvelope> {
        let tool_id = parse_tool_id(raw_tool_id)?;
        self.registry.require(&tool_id).map(format_tool_info)
    }

    /// One authenticated GET to the tool's endpoint; no retry, no breaker
    pub async fn validate_connection(&self, tool_id: &str) -> ConnectionCheck {
        let Some(tool) = self.registry.get(tool_id) else {
            return ConnectionCheck::failure(
                "Tool not found",
                format!("Tool with ID {} does not exist", tool_id),
                Duration::ZERO,
            );
        };

        info!(tool_id, "Validating connection");
        let start = Instant::now();
        match self.http.probe(tool, self.check_timeout).await {
            Ok(status) if (200..300).contains(&status) => {
                ConnectionCheck::success("Connection successful", start.elapsed(), status)
            }
            Ok(status) => {
                let message = if status == 401 || status == 403 {
                    "Authentication failed"
                } else {
                    "Connection failed"
                };
                let mut check = ConnectionCheck::failure(message, format!("Status code: {}", status), start.elapsed());
                check.status_code = Some(status);
                check
            }
            Err(e) => {
                warn!(tool_id, error = %e, "Connection check failed");
                ConnectionCheck::failure(
                    format!("Connection error: {}", e),
                    format!("{}: {}", e.kind(), e),
                    start.elapsed(),
                )
            }
        }
    }

    /// Get tool registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Fault-tolerant executor
    pub fn executor(&self) -> &FaultTolerantExecutor {
        self.orchestrator.executor()
    }

    /// Telemetry shared by every call
    pub fn telemetry(&self) -> &TelemetryCollector {
        self.executor().telemetry()
    }
}
