//! toolrelay - tool invocation and orchestration for AI agents
//!
//! Lets an agent call registered capabilities (HTTP APIs, in-process
//! functions, database queries) with bounded latency and isolated failures.
//!
//! # Architecture
//!
//! - **Invoker**: one attempt per call, auth headers, status classification
//! - **Fault-tolerant executor**: per-tool circuit breaker, retry with
//!   backoff and jitter, per-attempt timeout
//! - **Chain orchestrator**: concurrent fan-out, join-all, aggregation
//! - **Formatter**: structured envelopes for the calling model

pub mod errors;
pub mod tools;

// Re-export commonly used types
pub use errors::{Result, ToolError};

pub mod cli;
pub mod config;
pub mod logging;
pub mod telemetry;

pub use config::Config;
pub use tools::ToolRuntime;
