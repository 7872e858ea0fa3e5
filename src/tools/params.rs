//! Tolerant parsing of tool ids and parameters produced by a model

use crate::errors::{Result, ToolError};
use crate::tools::types::ExecutionParams;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

const UUID_LEN: usize = 36;

/// Parse a raw parameter string into an execution map.
///
/// Blank, `{}` and `null` give an empty map; a JSON object (or a JSON string
/// holding one) is used as-is; anything else becomes `{"input": raw}`.
pub fn parse_parameters(raw: &str) -> ExecutionParams {
    let cleaned = raw.trim();
    if cleaned.is_empty() || cleaned == "{}" || cleaned.eq_ignore_ascii_case("null") {
        return ExecutionParams::new();
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return map;
    }

    if cleaned.len() >= 2 && cleaned.starts_with('"') && cleaned.ends_with('"') {
        if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(cleaned) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&inner) {
                return map;
            }
        }
    }

    debug!(input = cleaned, "Treating parameters as plain text input");
    let mut params = ExecutionParams::new();
    params.insert("input".to_string(), Value::from(cleaned));
    params
}

/// Clean a raw tool id: strip quotes and whitespace, and prefer an embedded
/// UUID when the text contains one
pub fn parse_tool_id(raw: &str) -> Result<String> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '"' && *c != '\'').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ToolError::Validation("Tool ID cannot be null or empty".to_string()));
    }

    Ok(find_uuid(cleaned).unwrap_or_else(|| cleaned.to_string()))
}

/// First hyphenated UUID embedded in `text`
fn find_uuid(text: &str) -> Option<String> {
    if text.len() < UUID_LEN {
        return None;
    }
    (0..=text.len() - UUID_LEN)
        .filter(|&i| text.is_char_boundary(i) && text.is_char_boundary(i + UUID_LEN))
        .map(|i| &text[i..i + UUID_LEN])
        .find(|candidate| {
            let bytes = candidate.as_bytes();
            [8, 13, 18, 23].iter().all(|&p| bytes[p] == b'-') && Uuid::parse_str(candidate).is_ok()
        })
        .map(str::to_string)
}
