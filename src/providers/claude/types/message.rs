use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::types::{ContentBlock as LLMContentBlock, Message as LLMMessage, Role};

const IMAGE_SOURCE_BASE64: &str = "base64";

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: Role,
    pub content: MessageContent<'a>,
}

/// A lone text block goes over the wire as a plain string.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent<'a> {
    Text(&'a str),
    Blocks(Vec<ContentBlock<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock<'a> {
    Text {
        text: &'a str,
    },
    Image {
        source: ImageSource<'a>,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: &'a str,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ImageSource<'a> {
    #[serde(rename = "type")]
    pub source_type: &'static str,
    pub media_type: &'a str,
    pub data: &'a str,
}

impl<'a> From<&'a LLMContentBlock> for ContentBlock<'a> {
    fn from(block: &'a LLMContentBlock) -> Self {
        match block {
            LLMContentBlock::Text { text } => Self::Text { text },
            LLMContentBlock::Image { media_type, data } => Self::Image {
                source: ImageSource {
                    source_type: IMAGE_SOURCE_BASE64,
                    media_type,
                    data,
                },
            },
            LLMContentBlock::ToolUse(call) => Self::ToolUse {
                id: &call.id,
                name: &call.name,
                input: &call.input,
            },
            LLMContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Self::ToolResult {
                tool_use_id,
                content,
                is_error: *is_error,
            },
        }
    }
}

impl<'a> From<&'a LLMMessage> for Message<'a> {
    /// Empty blocks are dropped; callers skip messages that end up with none.
    fn from(message: &'a LLMMessage) -> Self {
        let blocks: Vec<&'a LLMContentBlock> = message
            .content
            .iter()
            .filter(|block| !block.is_empty())
            .collect();

        let content = match blocks[..] {
            [LLMContentBlock::Text { text }] => MessageContent::Text(text),
            _ => MessageContent::Blocks(blocks.iter().copied().map(ContentBlock::from).collect()),
        };

        Self {
            role: message.role,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// The message envelope carried by `message_start`
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}
