use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::error::ToolError;

use super::types::{Tool, ToolDefinition, ToolExecutor};

/// Registry for managing and looking up available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let def = tool.definition();
        debug!("[Tools] registered {}", def.name);
        self.tools.insert(def.name, Box::new(tool));
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<&dyn Tool> {
        Some(self.tools.get(name)?.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute_tool(&self, name: &str, input: &Value) -> Result<String, ToolError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        tool.execute(input).await
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.get_tool_definitions()
    }

    async fn execute(&self, name: &str, input: &Value) -> Result<String, ToolError> {
        self.execute_tool(name, input).await
    }

    fn failure_result(&self, name: &str, error: &ToolError) -> String {
        match self.get_tool(name) {
            Some(tool) => tool.failure_message(error),
            None => format!("Unknown tool `{name}`. No result available."),
        }
    }
}
