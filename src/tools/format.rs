//! Result formatting for the calling agent pipeline
//!
//! Every envelope is a plain serializable struct so field order in the
//! emitted JSON is stable.

use crate::tools::types::{ToolChainResult, ToolDescriptor, ToolExecutionResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::error;

/// Timestamp layout used in every envelope
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SUCCESS_MESSAGE: &str = "Tool executed successfully";
const FAILURE_MESSAGE: &str = "Tool execution failed";

/// Render a timestamp in envelope format
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Envelope for one tool result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    pub tool_name: String,
    pub tool_id: String,
    pub timestamp: String,
    pub execution_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub message: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Envelope for errors raised before a tool could run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error_type: String,
    pub error: String,
    pub timestamp: String,
    pub message: &'static str,
}

/// Envelope for a chain
#[derive(Debug, Clone, Serialize)]
pub struct ChainEnvelope {
    pub success: bool,
    pub summary: String,
    pub results: BTreeMap<String, Value>,
}

/// Envelope for a tool listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListEnvelope {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub tools: Vec<ToolSummary>,
}

/// One entry of a tool listing
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub endpoint: String,
}

impl ToolSummary {
    pub fn from_tool(tool: &ToolDescriptor) -> Self {
        Self {
            id: tool.id.clone(),
            name: tool.name.clone(),
            description: tool
                .description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            kind: tool.kind.as_str(),
            endpoint: tool.endpoint.clone(),
        }
    }
}

/// Detailed view of one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfoEnvelope {
    pub success: bool,
    #[serde(flatten)]
    pub tool: ToolSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Canonical envelope for one result
pub fn format_execution_result(result: &ToolExecutionResult) -> ResultEnvelope {
    let (payload, error, message) = if result.success {
        let payload = match &result.result {
            Some(Value::Null) | None => Value::from("Operation completed successfully"),
            Some(value) => value.clone(),
        };
        (Some(payload), None, SUCCESS_MESSAGE)
    } else {
        let error = result
            .error_message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());
        (None, Some(error), FAILURE_MESSAGE)
    };

    ResultEnvelope {
        success: result.success,
        tool_name: result.tool_name.clone(),
        tool_id: result.tool_id.clone(),
        timestamp: format_timestamp(&result.timestamp),
        execution_time_ms: result.execution_time_ms,
        result: payload,
        error,
        message,
        metadata: (!result.metadata.is_empty()).then(|| result.metadata.clone()),
    }
}

/// Envelope for an error that prevented execution
pub fn format_error(error_type: &str, error: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        success: false,
        error_type: error_type.to_string(),
        error: if error.is_empty() {
            "Unknown error".to_string()
        } else {
            error.to_string()
        },
        timestamp: format_timestamp(&Utc::now()),
        message: FAILURE_MESSAGE,
    }
}

/// Envelope for a chain result
pub fn format_chain_result(chain: &ToolChainResult) -> ChainEnvelope {
    ChainEnvelope {
        success: chain.success,
        summary: chain.summary.clone(),
        results: chain.results.clone(),
    }
}

/// Envelope listing tools
pub fn format_tool_list<'a>(
    tools: impl IntoIterator<Item = &'a ToolDescriptor>,
    organization_id: Option<&str>,
) -> ToolListEnvelope {
    let tools: Vec<ToolSummary> = tools.into_iter().map(ToolSummary::from_tool).collect();
    ToolListEnvelope {
        success: true,
        count: tools.len(),
        organization_id: organization_id.map(str::to_string),
        tools,
    }
}

/// Envelope describing one tool, including its parameter schema
pub fn format_tool_info(tool: &ToolDescriptor) -> ToolInfoEnvelope {
    ToolInfoEnvelope {
        success: true,
        tool: ToolSummary::from_tool(tool),
        parameters: tool.parameters.clone(),
    }
}

/// Serialize an envelope to a compact JSON string for the model
pub fn to_llm_string<T: Serialize>(envelope: &T) -> String {
    match serde_json::to_string(envelope) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize envelope");
            format!("{{\"success\": false, \"error\": {}}}", Value::from(e.to_string()))
        }
    }
}
