//! Chain orchestrator
//!
//! Resolves tool ids against an agent's bound tools, runs every resolved
//! call concurrently as its own task, waits for all of them (no fail-fast)
//! and aggregates the results in dispatch order.

use crate::errors::ToolError;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::aggregate::aggregate_results;
use crate::tools::executor::FaultTolerantExecutor;
use crate::tools::types::{Agent, ExecutionParams, ToolChainResult, ToolDescriptor};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Fan-out/fan-in over the fault-tolerant executor
#[derive(Clone)]
pub struct ChainOrchestrator {
    executor: FaultTolerantExecutor,

    /// Optional bound on concurrently running calls
    limiter: Option<Arc<Semaphore>>,
}

impl ChainOrchestrator {
    /// Create orchestrator with unbounded parallelism
    pub fn new(executor: FaultTolerantExecutor) -> Self {
        Self {
            executor,
            limiter: None,
        }
    }

    /// Bound the number of calls running at once (0 = unbounded)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.limiter = (max_parallel > 0).then(|| Arc::new(Semaphore::new(max_parallel)));
        self
    }

    /// Underlying executor
    pub fn executor(&self) -> &FaultTolerantExecutor {
        &self.executor
    }

    fn telemetry(&self) -> &TelemetryCollector {
        self.executor.telemetry()
    }

    /// Resolve ids against the agent's tools, dropping unknown ones
    pub fn resolve(agent: &Agent, tool_ids: &[String]) -> Vec<ToolDescriptor> {
        tool_ids
            .iter()
            .filter_map(|id| {
                let tool = agent.find_tool(id);
                if tool.is_none() {
                    warn!(tool_id = %id, agent_id = %agent.id, "Tool not bound to agent; skipping");
                }
                tool.cloned()
            })
            .collect()
    }

    /// Execute a chain of tools for one agent turn
    pub async fn execute_chain(&self, agent: &Agent, tool_ids: &[String], params: &ExecutionParams) -> ToolChainResult {
        let chain_id = Uuid::new_v4().to_string();
        let span = info_span!("tool_chain", chain_id = %chain_id, agent_id = %agent.id);
        self.execute_chain_inner(chain_id, agent, tool_ids, params)
            .instrument(span)
            .await
    }

    async fn execute_chain_inner(
        &self,
        chain_id: String,
        agent: &Agent,
        tool_ids: &[String],
        params: &ExecutionParams,
    ) -> ToolChainResult {
        let start = Instant::now();
        let tools = Self::resolve(agent, tool_ids);

        info!(tools = tools.len(), skipped = tool_ids.len() - tools.len(), "Dispatching chain");
        self.telemetry().record(TelemetryEvent::ChainDispatched {
            chain_id: chain_id.clone(),
            tool_count: tools.len(),
            skipped: tool_ids.len() - tools.len(),
            timestamp: start,
        });

        let handles = tools.into_iter().map(|tool| {
            let executor = self.executor.clone();
            let limiter = self.limiter.clone();
            let params = params.clone();
            tokio::spawn(
                async move {
                    let _permit = match limiter {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return Err(ToolError::Orchestration("parallelism limiter closed".into())),
                        },
                        None => None,
                    };
                    Ok(executor.execute_with_retry(&tool, &params).await)
                }
                .in_current_span(),
            )
        });

        let mut results = Vec::new();
        let mut failure = None;
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(ToolError::Orchestration(e.to_string()));
                }
            }
        }

        let chain = match failure {
            Some(error) => {
                warn!(error = %error, "Chain orchestration failed");
                ToolChainResult::orchestration_failure(&error)
            }
            None => aggregate_results(&results),
        };

        info!(success = chain.success, summary = %chain.summary, "Chain finished");
        self.telemetry().record(TelemetryEvent::ChainCompleted {
            chain_id,
            duration_ms: start.elapsed().as_millis() as u64,
            success: chain.success,
            timestamp: Instant::now(),
        });
        chain
    }
}
