//! Error types for toolrelay
//!
//! One taxonomy covers every way a tool call can go wrong. Ordinary failures
//! are folded into a `ToolExecutionResult` by the fault-tolerant executor;
//! only integrity errors (unknown tool, bad configuration) escape as `Err`.

use thiserror::Error;

/// Main error type for tool invocation and orchestration
#[derive(Error, Debug)]
pub enum ToolError {
    /// Malformed tool id or descriptor (never retried)
    #[error("Invalid tool configuration: {0}")]
    Validation(String),

    /// Tool id could not be resolved against the registry
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    /// Connection, DNS or protocol failure
    #[error("Tool execution error: {0}")]
    Transport(String),

    /// 5xx response
    #[error("Tool execution failed with status: {status} - {body}")]
    Server { status: u16, body: String },

    /// Non-auth 4xx (or other non-2xx) response
    #[error("Tool execution failed with status: {status} - {body}")]
    Client { status: u16, body: String },

    /// 401 / 403 response
    #[error("Authentication failed with status: {status} - {body}")]
    Auth { status: u16, body: String },

    /// Attempt exceeded its time bound
    #[error("Tool execution timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Breaker rejected the call without a network attempt
    #[error("Circuit breaker open for tool {tool_id}; retry in {retry_after_ms}ms")]
    CircuitOpen { tool_id: String, retry_after_ms: u64 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Task-join or dispatch machinery failed
    #[error("Tool chain execution failed: {0}")]
    Orchestration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for toolrelay operations
pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    /// Classify a non-2xx HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ToolError::Auth { status, body },
            500..=599 => ToolError::Server { status, body },
            _ => ToolError::Client { status, body },
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::Transport(_) | ToolError::Server { .. } | ToolError::Timeout { .. }
        )
    }

    /// Whether this failure says something about the target's health.
    /// Configuration mistakes and breaker rejections do not.
    pub fn counts_against_circuit(&self) -> bool {
        !matches!(
            self,
            ToolError::Validation(_)
                | ToolError::UnknownTool(_)
                | ToolError::Config(_)
                | ToolError::CircuitOpen { .. }
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::Server { status, .. }
            | ToolError::Client { status, .. }
            | ToolError::Auth { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable label used in result metadata and formatted output
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Transport(_) => "transport",
            ToolError::Server { .. } => "server",
            ToolError::Client { .. } => "client",
            ToolError::Auth { .. } => "auth",
            ToolError::Timeout { .. } => "timeout",
            ToolError::CircuitOpen { .. } => "circuit_open",
            ToolError::Config(_) => "config",
            ToolError::Orchestration(_) => "orchestration",
            ToolError::Serialization(_) => "serialization",
        }
    }
}
