//! Tool invocation and orchestration
//!
//! - Single-attempt invoker with pluggable auth (REST, function, database)
//! - Fault-tolerant executor: breaker → retry → timeout → invoker
//! - Chain orchestrator with join-all fan-out and aggregation
//! - Result formatting for the calling agent pipeline

pub mod aggregate;
pub mod auth;
pub mod breaker;
pub mod executor;
pub mod format;
pub mod implementations;
pub mod invoker;
pub mod orchestrator;
pub mod params;
pub mod registry;
pub mod retry;
pub mod runtime;
pub mod types;

// Re-export commonly used types
pub use aggregate::aggregate_results;
pub use breaker::{BreakerConfig, CircuitBreakerRegistry, CircuitPhase};
pub use executor::FaultTolerantExecutor;
pub use implementations::{FunctionRegistry, HttpHandler, QueryBackend, ToolFunction};
pub use invoker::{Invoke, Invoker};
pub use orchestrator::ChainOrchestrator;
pub use registry::{AgentBinding, Catalog, ToolRegistry};
pub use retry::RetryPolicy;
pub use runtime::{ConnectionCheck, ToolRuntime};
pub use types::{
    Agent, AuthConfig, ExecutionParams, InvocationOutput, ToolChainResult, ToolDescriptor, ToolExecutionResult,
    ToolKind,
};
