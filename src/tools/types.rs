use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ToolError;

/// Represents a tool call with its identifier, name, and input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for the tool call, echoed back in the tool result
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input passed to the tool, shaped by the tool's schema
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

impl Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.input)
    }
}

/// Static description of a tool, sent with every request that enables tool use
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema of the tool's input (`type`, `properties`, `required`)
    pub input_schema: Value,
}

/// Trait that must be implemented by all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition including its name, description, and input schema
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the provided input
    ///
    /// # Arguments
    /// * `input` - JSON value containing the tool's input
    ///
    /// # Returns
    /// * `Result<String, ToolError>` - Text handed back to the model, or the failure
    async fn execute(&self, input: &Value) -> Result<String, ToolError>;

    /// Text handed back to the model when `execute` fails
    fn failure_message(&self, error: &ToolError) -> String {
        format!("Tool execution failed: {error}")
    }
}

/// Dispatches tool calls by name on behalf of the conversation loop
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn execute(&self, name: &str, input: &Value) -> Result<String, ToolError>;

    /// Tool result content used in place of a failed execution
    fn failure_result(&self, _name: &str, error: &ToolError) -> String {
        format!("Tool execution failed: {error}")
    }
}
