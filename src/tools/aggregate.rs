//! Folding per-tool results into a chain result

use crate::tools::types::{ToolChainResult, ToolExecutionResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// Combine results in dispatch order.
///
/// - `success` is the AND of every member (vacuously true when empty)
/// - `summary` is `"<name>: success|failed"` joined by `", "`
/// - `results` maps tool id to the raw payload, `null` for failures;
///   a repeated tool id keeps the later entry
pub fn aggregate_results(results: &[ToolExecutionResult]) -> ToolChainResult {
    let success = results.iter().all(|r| r.success);

    let summary = results
        .iter()
        .map(|r| {
            format!(
                "{}: {}",
                r.display_name(),
                if r.success { "success" } else { "failed" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut map = BTreeMap::new();
    for r in results {
        let value = if r.success {
            r.result.clone().unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        map.insert(r.tool_id.clone(), value);
    }

    ToolChainResult {
        success,
        summary,
        results: map,
    }
}
