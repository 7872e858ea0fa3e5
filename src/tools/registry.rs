//! Tool registry
//!
//! In-memory catalog of tool descriptors keyed by id, plus agent bindings
//! (which tool ids an agent may call). Can be loaded from a JSON catalog:
//!
//! ```json
//! { "tools": [ { "id": "...", "name": "...", "type": "REST_API", ... } ],
//!   "agents": [ { "id": "...", "name": "...", "tools": ["tool-id", ...] } ] }
//! ```

use crate::errors::{Result, ToolError};
use crate::tools::types::{Agent, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Id used for the implicit agent bound to every registered tool
pub const DEFAULT_AGENT_ID: &str = "default";

/// Agent entry in a catalog: tool ids rather than descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBinding {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tools: Vec<String>,
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,

    #[serde(default)]
    pub agents: Vec<AgentBinding>,
}

/// Tool registry
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Map of tool id to descriptor
    tools: HashMap<String, ToolDescriptor>,

    /// Map of agent id to bound tool ids
    agents: HashMap<String, AgentBinding>,
}

impl ToolRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build registry from a parsed catalog
    pub fn from_catalog(catalog: Catalog) -> Result<Self> {
        let mut registry = Self::new();
        for tool in catalog.tools {
            registry.register(tool)?;
        }
        for agent in catalog.agents {
            registry.register_agent(agent);
        }
        Ok(registry)
    }

    /// Parse a JSON catalog
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        Self::from_catalog(catalog)
    }

    /// Load a JSON catalog file
    pub fn load_catalog(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ToolError::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json(&content)?;
        debug!(path = %path.display(), tools = registry.len(), "Loaded tool catalog");
        Ok(registry)
    }

    /// Register a tool after validating it. Replaces any tool with the same id.
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<()> {
        tool.validate()?;
        if self.tools.contains_key(&tool.id) {
            warn!(tool_id = %tool.id, "Replacing registered tool");
        }
        self.tools.insert(tool.id.clone(), tool);
        Ok(())
    }

    /// Bind tool ids to an agent
    pub fn register_agent(&mut self, binding: AgentBinding) {
        self.agents.insert(binding.id.clone(), binding);
    }

    /// Get tool by id
    pub fn get(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.get(id)
    }

    /// Get tool by id, failing with `UnknownTool`
    pub fn require(&self, id: &str) -> Result<&ToolDescriptor> {
        self.get(id).ok_or_else(|| ToolError::UnknownTool(id.to_string()))
    }

    /// Check if tool exists
    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    /// Tools visible to an organization (all tools when `None`), sorted by name
    pub fn list(&self, organization_id: Option<&str>) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<&ToolDescriptor> = self
            .tools
            .values()
            .filter(|tool| match organization_id {
                Some(org) => tool.organization_id.as_deref() == Some(org),
                None => true,
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tools
    }

    /// Get all tool ids, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Agent ids, sorted
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Resolve an agent with its bound tools. Bound ids missing from the
    /// registry are skipped.
    pub fn agent(&self, id: &str) -> Option<Agent> {
        let binding = self.agents.get(id)?;
        let tools = binding
            .tools
            .iter()
            .filter_map(|tool_id| {
                let tool = self.get(tool_id);
                if tool.is_none() {
                    warn!(agent_id = %id, tool_id = %tool_id, "Agent bound to unknown tool; skipping");
                }
                tool.cloned()
            })
            .collect();
        Some(Agent::new(binding.id.clone(), binding.name.clone(), tools))
    }

    /// Implicit agent bound to every registered tool
    pub fn default_agent(&self) -> Agent {
        let tools = self.list(None).into_iter().cloned().collect();
        Agent::new(DEFAULT_AGENT_ID, DEFAULT_AGENT_ID, tools)
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
