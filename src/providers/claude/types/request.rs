use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::providers::types::ChatRequest;
use crate::tools::ToolDefinition as LLMToolDefinition;

use super::Message;

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct Tool<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub input_schema: &'a Value,
}

impl<'a> From<&'a LLMToolDefinition> for Tool<'a> {
    fn from(tool_definition: &'a LLMToolDefinition) -> Self {
        Self {
            name: &tool_definition.name,
            description: &tool_definition.description,
            input_schema: &tool_definition.input_schema,
        }
    }
}

impl<'a> ChatCompletionRequest<'a> {
    pub const fn new(model: &'a str, max_tokens: u32, messages: Vec<Message<'a>>) -> Self {
        Self {
            model,
            max_tokens,
            messages,
            stream: None,
            system: None,
            tools: None,
        }
    }

    pub const fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub const fn with_system(mut self, system: &'a str) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool<'a>>) -> Self {
        self.tools = Some(tools);
        self
    }
}

impl<'a> From<&'a ChatRequest> for ChatCompletionRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        let messages: Vec<Message> = request
            .messages
            .iter()
            .filter(|message| {
                let keep = !message.is_empty();
                if !keep {
                    debug!("[Claude] skipping empty {:?} message", message.role);
                }
                keep
            })
            .map(Message::from)
            .collect();

        let mut completion = Self::new(&request.model, request.max_tokens, messages);

        if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
            completion = completion.with_system(system);
        }

        if !request.tools.is_empty() {
            completion = completion.with_tools(request.tools.iter().map(Tool::from).collect());
        }

        completion
    }
}
