//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the model look things up: card data, combos, and the
//! Comprehensive Rules. Each tool declares an [`InputSchema`] and an async
//! handler; the [`ToolRegistry`] maps tool names to implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema::InputSchema;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Why a tool call produced an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailure {
    UnknownTool,
    InvalidArguments,
    ExecutionFailed,
    Timeout,
    Panicked,
}

/// The result of a tool execution, as sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub call_id: String,

    /// Text content (markdown or JSON), or a human-readable error
    pub content: String,

    /// Whether the call failed
    #[serde(default)]
    pub is_error: bool,

    /// Failure category; `None` on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ToolFailure>,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
            failure: None,
        }
    }

    pub fn error(call_id: impl Into<String>, failure: ToolFailure, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
            failure: Some(failure),
        }
    }

    /// Result for a call naming a tool that is not registered.
    pub fn unknown_tool(call: &ToolCall) -> Self {
        Self::error(&call.id, ToolFailure::UnknownTool, format!("Unknown tool: {}", call.name))
    }
}

/// The core Tool trait.
///
/// Implementations only see validated arguments when dispatched through the
/// agent's executor, but should still parse defensively: `validate` checks
/// shape, not meaning.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "scryfall_get_card").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// The declared parameters.
    fn input_schema(&self) -> InputSchema;

    /// Check arguments before dispatch.
    fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        self.input_schema().validate(arguments)
    }

    /// Execute the tool, returning the text to hand back to the model.
    async fn execute(&self, arguments: &serde_json::Value) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema().to_json(),
        }
    }
}

/// A registry of available tools.
///
/// Built once at startup and then shared read-only (typically behind an
/// `Arc`). Definitions are reported in registration order so every model
/// request declares tools identically.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Iterate over registered tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
