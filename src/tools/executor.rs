//! Fault-tolerant executor
//!
//! Layers, outermost first:
//! 1. Circuit breaker gate (per tool id, one outcome recorded per call)
//! 2. Retry with exponential backoff
//! 3. Per-attempt timeout
//! 4. Single-attempt invoker
//!
//! Ordinary failures never escape as `Err`; every call ends in a
//! `ToolExecutionResult`.

use crate::errors::{Result, ToolError};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::breaker::{Admission, BreakerConfig, CallOutcome, CircuitBreakerRegistry, CircuitPhase};
use crate::tools::invoker::{Invoke, Invoker};
use crate::tools::retry::RetryPolicy;
use crate::tools::types::{ExecutionParams, InvocationOutput, ToolDescriptor, ToolExecutionResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Per-attempt time bound (10 seconds)
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Executor wrapping an invoker with breaker, retry and timeout
#[derive(Clone)]
pub struct FaultTolerantExecutor {
    /// Single-attempt invoker
    invoker: Arc<dyn Invoke>,

    /// Retry policy
    retry: RetryPolicy,

    /// Time bound for each attempt
    attempt_timeout: Duration,

    /// Breakers shared by every caller of this executor
    breakers: Arc<CircuitBreakerRegistry>,

    /// Event sink
    telemetry: TelemetryCollector,
}

impl FaultTolerantExecutor {
    /// Create executor with default policies around the given invoker
    pub fn new(invoker: Arc<dyn Invoke>) -> Self {
        Self {
            invoker,
            retry: RetryPolicy::new(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            breakers: Arc::new(CircuitBreakerRegistry::new(BreakerConfig::default())),
            telemetry: TelemetryCollector::new(),
        }
    }

    /// Create executor around the default HTTP/function invoker
    pub fn with_default_invoker() -> Result<Self> {
        Ok(Self::new(Arc::new(Invoker::new()?)))
    }

    /// Set retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set per-attempt timeout
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Replace breaker registry with fresh thresholds
    pub fn with_breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breakers = Arc::new(CircuitBreakerRegistry::new(config));
        self
    }

    /// Share an existing breaker registry
    pub fn with_breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = breakers;
        self
    }

    /// Set telemetry collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Execute one tool call with breaker, retry and timeout
    pub async fn execute_with_retry(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> ToolExecutionResult {
        let span = info_span!("tool_call", tool_id = %tool.id, tool_name = %tool.name);
        self.execute_inner(tool, params).instrument(span).await
    }

    async fn execute_inner(&self, tool: &ToolDescriptor, params: &ExecutionParams) -> ToolExecutionResult {
        let start = Instant::now();
        info!("Tool call started");
        self.telemetry.record(TelemetryEvent::ToolStarted {
            tool_id: tool.id.clone(),
            timestamp: start,
        });

        let admission = self.breakers.admit(&tool.id);
        if let Admission::Rejected { retry_after } = admission {
            warn!(retry_after_ms = retry_after.as_millis() as u64, "Circuit open; call rejected");
            self.telemetry.record(TelemetryEvent::CircuitRejected {
                tool_id: tool.id.clone(),
                timestamp: Instant::now(),
            });
            let error = ToolError::CircuitOpen {
                tool_id: tool.id.clone(),
                retry_after_ms: retry_after.as_millis() as u64,
            };
            let phase = self.breakers.phase(&tool.id).unwrap_or(CircuitPhase::Open);
            return self.finish(tool, Err(error), 0, phase, start);
        }
        // Held across the retry loop; releases the half-open slot if this
        // future is dropped or the invoker panics
        let probe = (admission == Admission::Probe).then(|| {
            debug!("Running half-open probe");
            self.breakers.probe_guard(&tool.id)
        });

        let attempt_timeout = self.attempt_timeout;
        let invoker = &self.invoker;
        let telemetry = &self.telemetry;

        let outcome = self
            .retry
            .execute_with_notify(
                |attempt| async move {
                    let result = match timeout(attempt_timeout, invoker.attempt(tool, params)).await {
                        Ok(result) => result,
                        Err(_) => Err(ToolError::Timeout {
                            duration_ms: attempt_timeout.as_millis() as u64,
                        }),
                    };
                    if let Err(e) = &result {
                        debug!(attempt, error = %e, "Attempt failed");
                        telemetry.record(TelemetryEvent::AttemptFailed {
                            tool_id: tool.id.clone(),
                            attempt,
                            error_kind: e.kind(),
                            timestamp: Instant::now(),
                        });
                    }
                    result
                },
                |attempt, _, delay| {
                    telemetry.record(TelemetryEvent::RetryScheduled {
                        tool_id: tool.id.clone(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        timestamp: Instant::now(),
                    });
                },
            )
            .await;

        let call_outcome = match &outcome.result {
            Ok(_) => CallOutcome::Success,
            Err(e) if e.counts_against_circuit() => CallOutcome::Failure,
            Err(_) => CallOutcome::Ignored,
        };
        let transition = match probe {
            Some(guard) => guard.record(call_outcome),
            None => self.breakers.record(&tool.id, admission, call_outcome),
        };
        if let Some(transition) = transition {
            self.telemetry.record(TelemetryEvent::CircuitTransition {
                tool_id: tool.id.clone(),
                from: transition.from,
                to: transition.to,
                timestamp: Instant::now(),
            });
        }

        let phase = self.breakers.phase(&tool.id).unwrap_or(CircuitPhase::Closed);
        self.finish(tool, outcome.result, outcome.attempts, phase, start)
    }

    fn finish(
        &self,
        tool: &ToolDescriptor,
        outcome: Result<InvocationOutput>,
        attempts: u32,
        phase: CircuitPhase,
        start: Instant,
    ) -> ToolExecutionResult {
        let result = ToolExecutionResult::from_outcome(tool, outcome, start.elapsed())
            .with_metadata("attempts", Value::from(attempts))
            .with_metadata("circuitPhase", Value::from(phase.as_str()));

        self.telemetry.record(TelemetryEvent::ToolCompleted {
            tool_id: tool.id.clone(),
            duration_ms: result.execution_time_ms,
            attempts,
            success: result.success,
            timestamp: Instant::now(),
        });
        info!(
            success = result.success,
            attempts,
            duration_ms = result.execution_time_ms,
            "Tool call finished"
        );
        result
    }

    /// Breaker registry
    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Telemetry collector
    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Per-attempt timeout
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}
