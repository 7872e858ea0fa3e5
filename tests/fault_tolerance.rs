//! Breaker, retry and timeout behavior on a paused clock.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toolrelay::tools::breaker::{Admission, CallOutcome};
use toolrelay::tools::{
    CircuitPhase, ExecutionParams, HttpHandler, InvocationOutput, Invoke, ToolDescriptor, ToolKind, ToolRegistry,
};
use toolrelay::{Config, Result, ToolError, ToolRuntime};
use tokio::time::Instant;

/// Invoker whose behavior can be switched between calls
#[derive(Default)]
struct Switchable {
    healthy: AtomicBool,
    hang: AtomicBool,
    panic: AtomicBool,
    calls: AtomicU32,
}

impl Switchable {
    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Invoke for Switchable {
    async fn attempt(&self, tool: &ToolDescriptor, _params: &ExecutionParams) -> Result<InvocationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic.load(Ordering::SeqCst) {
            panic!("tool handler panicked");
        }
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(InvocationOutput::http(json!({"tool": tool.id}), 200))
        } else {
            Err(ToolError::from_status(500, "down"))
        }
    }
}

fn runtime(invoker: Arc<Switchable>) -> ToolRuntime {
    let mut registry = ToolRegistry::new();
    for id in ["a", "b"] {
        registry
            .register(ToolDescriptor::new(
                id,
                format!("tool-{id}"),
                ToolKind::RestApi,
                format!("http://127.0.0.1:1/{id}"),
            ))
            .unwrap();
    }
    ToolRuntime::from_parts(&Config::default(), registry, invoker, HttpHandler::new().unwrap())
}

#[tokio::test(start_paused = true)]
async fn breaker_opens_rejects_and_recovers_through_probe() {
    let invoker = Arc::new(Switchable::default());
    let runtime = runtime(invoker.clone());
    let none = ExecutionParams::new();

    for _ in 0..10 {
        let result = runtime.execute_by_id("a", &none).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.metadata["attempts"], json!(4));
    }
    assert_eq!(invoker.calls(), 40);
    assert_eq!(runtime.executor().breakers().phase("a"), Some(CircuitPhase::Open));

    // Rejected without touching the invoker
    let rejected = runtime.execute_by_id("a", &none).await.unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.metadata["errorKind"], json!("circuit_open"));
    assert_eq!(rejected.metadata["attempts"], json!(0));
    assert_eq!(invoker.calls(), 40);

    // Other tools are isolated
    invoker.healthy.store(true, Ordering::SeqCst);
    assert!(runtime.execute_by_id("b", &none).await.unwrap().success);
    assert_eq!(runtime.executor().breakers().phase("b"), Some(CircuitPhase::Closed));

    tokio::time::advance(Duration::from_secs(30)).await;

    let probe = runtime.execute_by_id("a", &none).await.unwrap();
    assert!(probe.success);
    assert_eq!(probe.result, Some(json!({"tool": "a"})));
    assert_eq!(runtime.executor().breakers().phase("a"), Some(CircuitPhase::Closed));

    let stats = runtime.telemetry().get_stats();
    assert_eq!(stats.circuit_rejections, 1);
    // Closed -> Open, then HalfOpen -> Closed after the probe
    assert_eq!(stats.circuit_transitions, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_reopens_breaker() {
    let invoker = Arc::new(Switchable::default());
    let runtime = runtime(invoker.clone());
    let none = ExecutionParams::new();

    for _ in 0..10 {
        runtime.execute_by_id("a", &none).await.unwrap();
    }
    tokio::time::advance(Duration::from_secs(30)).await;

    let probe = runtime.execute_by_id("a", &none).await.unwrap();
    assert!(!probe.success);
    assert_eq!(runtime.executor().breakers().phase("a"), Some(CircuitPhase::Open));

    let calls = invoker.calls();
    let rejected = runtime.execute_by_id("a", &none).await.unwrap();
    assert_eq!(rejected.metadata["errorKind"], json!("circuit_open"));
    assert_eq!(invoker.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn hanging_tool_is_bounded_by_timeouts_and_backoff() {
    let invoker = Arc::new(Switchable::default());
    invoker.hang.store(true, Ordering::SeqCst);
    let runtime = runtime(invoker.clone());

    let start = Instant::now();
    let result = runtime.execute_by_id("a", &ExecutionParams::new()).await.unwrap();
    let elapsed = start.elapsed();

    assert!(!result.success);
    assert_eq!(result.metadata["errorKind"], json!("timeout"));
    assert_eq!(result.metadata["attempts"], json!(4));
    assert_eq!(invoker.calls(), 4);
    // 4 x 10s attempts + 1s + 2s + 4s backoff, each with up to 200ms jitter
    assert!(elapsed >= Duration::from_millis(47_000));
    assert!(elapsed <= Duration::from_millis(47_600));
}

#[tokio::test(start_paused = true)]
async fn chain_members_run_concurrently() {
    let invoker = Arc::new(Switchable::default());
    invoker.hang.store(true, Ordering::SeqCst);
    let runtime = runtime(invoker.clone());
    let ids = vec!["a".to_string(), "b".to_string()];

    let start = Instant::now();
    let chain = runtime.execute_chain_for(None, &ids, &ExecutionParams::new()).await.unwrap();

    assert!(!chain.success);
    assert_eq!(chain.results["a"], Value::Null);
    assert_eq!(chain.results["b"], Value::Null);
    assert_eq!(invoker.calls(), 8);
    // Sequential execution would take about 94s
    assert!(start.elapsed() <= Duration::from_millis(47_600));
}

#[tokio::test(start_paused = true)]
async fn model_output_for_open_breaker() {
    let invoker = Arc::new(Switchable::default());
    let runtime = runtime(invoker);

    for _ in 0..10 {
        runtime.execute_for_model("a", "").await;
    }
    let out = runtime.execute_for_model("a", "").await;
    let value: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["success"], json!(false));
    assert!(value["error"].as_str().unwrap().contains("Circuit breaker open"));
}

async fn open_and_cool_down(runtime: &ToolRuntime) {
    for _ in 0..10 {
        runtime.execute_by_id("a", &ExecutionParams::new()).await.unwrap();
    }
    assert_eq!(runtime.executor().breakers().phase("a"), Some(CircuitPhase::Open));
    tokio::time::advance(Duration::from_secs(30)).await;
}

#[tokio::test(start_paused = true)]
async fn panicking_trial_call_does_not_wedge_breaker() {
    let invoker = Arc::new(Switchable::default());
    let runtime = runtime(invoker.clone());
    open_and_cool_down(&runtime).await;

    invoker.panic.store(true, Ordering::SeqCst);
    let chain = runtime
        .execute_chain_for(None, &["a".to_string()], &ExecutionParams::new())
        .await
        .unwrap();
    assert!(!chain.success);
    assert!(chain.summary.starts_with("Tool chain execution failed"));

    invoker.panic.store(false, Ordering::SeqCst);
    invoker.healthy.store(true, Ordering::SeqCst);
    let result = runtime.execute_by_id("a", &ExecutionParams::new()).await.unwrap();
    assert!(result.success);
    assert_eq!(runtime.executor().breakers().phase("a"), Some(CircuitPhase::Closed));
}

#[tokio::test(start_paused = true)]
async fn caller_timeout_on_trial_call_does_not_wedge_breaker() {
    let invoker = Arc::new(Switchable::default());
    let runtime = runtime(invoker.clone());
    open_and_cool_down(&runtime).await;

    invoker.hang.store(true, Ordering::SeqCst);
    let turn = tokio::time::timeout(
        Duration::from_secs(1),
        runtime.execute_by_id("a", &ExecutionParams::new()),
    )
    .await;
    assert!(turn.is_err());

    invoker.hang.store(false, Ordering::SeqCst);
    invoker.healthy.store(true, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(3600)).await;
    let result = runtime.execute_by_id("a", &ExecutionParams::new()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.metadata["circuitPhase"], json!("closed"));
}

#[tokio::test(start_paused = true)]
async fn slow_call_from_before_opening_does_not_close_breaker() {
    let invoker = Arc::new(Switchable::default());
    invoker.hang.store(true, Ordering::SeqCst);
    let runtime = Arc::new(runtime(invoker.clone()));

    // Admitted while closed; finishes only after its own timeouts and backoff
    let slow = {
        let runtime = runtime.clone();
        tokio::spawn(async move { runtime.execute_by_id("a", &ExecutionParams::new()).await.unwrap() })
    };
    tokio::task::yield_now().await;

    let breakers = runtime.executor().breakers().clone();
    for _ in 0..10 {
        let admission = breakers.admit("a");
        breakers.record("a", admission, CallOutcome::Failure);
    }
    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(breakers.admit("a"), Admission::Probe);

    invoker.hang.store(false, Ordering::SeqCst);
    invoker.healthy.store(true, Ordering::SeqCst);
    assert!(slow.await.unwrap().success);

    // The outstanding half-open call still owns the decision
    assert_eq!(breakers.phase("a"), Some(CircuitPhase::HalfOpen));
    assert!(matches!(breakers.admit("a"), Admission::Rejected { .. }));
}

