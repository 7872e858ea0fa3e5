//! In-process function tools
//!
//! A `Function` tool's endpoint names an async handler registered here.

use crate::errors::{Result, ToolError};
use crate::tools::types::ExecutionParams;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Async handler backing a `Function` tool
#[async_trait]
pub trait ToolFunction: Send + Sync {
    async fn call(&self, params: ExecutionParams) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> ToolFunction for F
where
    F: Fn(ExecutionParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn call(&self, params: ExecutionParams) -> Result<Value> {
        (self)(params).await
    }
}

/// Function handlers keyed by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ToolFunction>>,
}

impl FunctionRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, function: impl ToolFunction + 'static) {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Builder-style registration
    pub fn with(mut self, name: impl Into<String>, function: impl ToolFunction + 'static) -> Self {
        self.register(name, function);
        self
    }

    /// Check if a handler exists
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run the named handler
    pub async fn call(&self, name: &str, params: &ExecutionParams) -> Result<Value> {
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::Validation(format!("No function registered as '{}'", name)))?;
        function.call(params.clone()).await
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
