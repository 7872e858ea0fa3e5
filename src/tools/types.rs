//! Tool execution types and structures
//!
//! Descriptors come from the external registry and are treated as read-only
//! for the duration of a call. Results are what the agent runtime consumes.

use crate::errors::{Result, ToolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Caller-supplied parameters for one invocation
pub type ExecutionParams = Map<String, Value>;

/// Category of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolKind {
    /// Remote HTTP endpoint
    RestApi,

    /// In-process async function
    Function,

    /// Database query
    Database,
}

impl ToolKind {
    /// Label used in metadata and listings
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::RestApi => "REST_API",
            ToolKind::Function => "FUNCTION",
            ToolKind::Database => "DATABASE",
        }
    }
}

/// Stored authentication configuration for a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum AuthConfig {
    #[default]
    #[serde(rename = "NONE")]
    None,

    #[serde(rename = "API_KEY")]
    ApiKey { key: String },

    #[serde(rename = "BASIC_AUTH")]
    Basic { username: String, password: String },

    /// Static bearer token; no refresh flow
    #[serde(rename = "OAUTH2")]
    OAuth2 { token: String },
}

impl AuthConfig {
    /// Scheme name for logs (never includes secrets)
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::OAuth2 { .. } => "oauth2",
        }
    }
}

/// Registered tool, as handed over by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: ToolKind,

    /// URI for REST tools, function name for in-process tools
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Parameter schema, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl ToolDescriptor {
    /// Create a descriptor with no auth and no schema
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ToolKind,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind,
            endpoint: endpoint.into(),
            auth: AuthConfig::None,
            parameters: None,
            organization_id: None,
        }
    }

    /// Set auth configuration
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set parameter schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set owning organization
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Name for human-readable output, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Structural checks that do not depend on the kind's handler
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ToolError::Validation("Tool id is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ToolError::Validation(format!(
                "Tool name is required (tool {})",
                self.id
            )));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ToolError::Validation(format!(
                "Tool endpoint is required (tool {})",
                self.id
            )));
        }
        if self.kind == ToolKind::RestApi {
            parse_http_endpoint(&self.endpoint)?;
        }
        match &self.auth {
            AuthConfig::ApiKey { key } if key.is_empty() => Err(ToolError::Validation(
                "API key must not be empty".to_string(),
            )),
            AuthConfig::Basic { username, .. } if username.is_empty() => Err(
                ToolError::Validation("Basic auth username must not be empty".to_string()),
            ),
            AuthConfig::OAuth2 { token } if token.is_empty() => Err(ToolError::Validation(
                "OAuth2 token must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Parse an absolute http(s) endpoint
pub fn parse_http_endpoint(endpoint: &str) -> Result<reqwest::Url> {
    let url = reqwest::Url::parse(endpoint.trim())
        .map_err(|e| ToolError::Validation(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::Validation(format!(
            "Unsupported endpoint scheme '{}' for '{}'",
            other, endpoint
        ))),
    }
}

/// An agent together with the tools bound to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl Agent {
    /// Create new agent with bound tools
    pub fn new(id: impl Into<String>, name: impl Into<String>, tools: Vec<ToolDescriptor>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tools,
        }
    }

    /// Look up one of the agent's bound tools
    pub fn find_tool(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.id == tool_id)
    }
}

/// Payload of one successful attempt
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutput {
    /// Parsed body (JSON, raw text as string, or null when empty)
    pub value: Value,

    /// HTTP status when the call went over the wire
    pub status: Option<u16>,
}

impl InvocationOutput {
    /// Output of an in-process call
    pub fn local(value: Value) -> Self {
        Self {
            value,
            status: None,
        }
    }

    /// Output of an HTTP call
    pub fn http(value: Value, status: u16) -> Self {
        Self {
            value,
            status: Some(status),
        }
    }
}

/// Terminal result of executing one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionResult {
    pub tool_id: String,

    pub tool_name: String,

    pub success: bool,

    /// Present iff `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Present iff not `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub execution_time_ms: u64,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ToolExecutionResult {
    /// Create successful result. A `null` payload is still a payload.
    pub fn success(tool: &ToolDescriptor, result: Value, duration: Duration) -> Self {
        Self {
            tool_id: tool.id.clone(),
            tool_name: tool.name.clone(),
            success: true,
            result: Some(result),
            error_message: None,
            execution_time_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Create failed result
    pub fn failure(tool: &ToolDescriptor, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            tool_id: tool.id.clone(),
            tool_name: tool.name.clone(),
            success: false,
            result: None,
            error_message: Some(error.into()),
            execution_time_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Build from an attempt outcome, filling status and error metadata
    pub fn from_outcome(
        tool: &ToolDescriptor,
        outcome: Result<InvocationOutput>,
        duration: Duration,
    ) -> Self {
        let mut result = match outcome {
            Ok(output) => {
                let status = output.status;
                let mut result = Self::success(tool, output.value, duration);
                if let Some(status) = status {
                    result = result.with_metadata("statusCode", Value::from(status));
                }
                result
            }
            Err(err) => {
                let mut result = Self::failure(tool, err.to_string(), duration)
                    .with_metadata("errorKind", Value::from(err.kind()));
                if let Some(status) = err.status() {
                    result = result.with_metadata("statusCode", Value::from(status));
                }
                result
            }
        };
        result.metadata.insert("toolId".to_string(), Value::from(tool.id.clone()));
        result.metadata.insert("toolName".to_string(), Value::from(tool.name.clone()));
        result.metadata.insert("toolType".to_string(), Value::from(tool.kind.as_str()));
        result
    }

    /// Attach one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Name for summaries, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.tool_name.trim().is_empty() {
            &self.tool_id
        } else {
            &self.tool_name
        }
    }
}

/// Aggregated outcome of a chain of tool calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChainResult {
    /// AND of all member results
    pub success: bool,

    /// `"<name>: success|failed"` joined by ", "
    pub summary: String,

    /// Raw payload per tool id; `null` for failures
    pub results: BTreeMap<String, Value>,
}

impl ToolChainResult {
    /// Chain that could not be orchestrated at all
    pub fn orchestration_failure(error: &ToolError) -> Self {
        Self {
            success: false,
            summary: error.to_string(),
            results: BTreeMap::new(),
        }
    }
}
