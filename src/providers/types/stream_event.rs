use crate::core::LLMError;
use crate::tools::ToolCall;

/// Typed events surfaced by a streaming chat call, in arrival order.
///
/// A stream yields `MessageStart` first and ends with exactly one terminal
/// event: `MessageEnd` or `Error`. Nothing follows a terminal event.
#[derive(Debug)]
pub enum StreamEvent {
    MessageStart,
    /// A fragment of assistant text
    Text(String),
    /// A fully accumulated tool invocation
    ToolUse(ToolCall),
    MessageEnd,
    Error(LLMError),
}

impl StreamEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageEnd | Self::Error(_))
    }

    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text(delta.into())
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::Error(LLMError::ApiError(message.into()))
    }

    /// Copies every event except `Error`, whose cause cannot be duplicated.
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            Self::MessageStart => Some(Self::MessageStart),
            Self::Text(text) => Some(Self::Text(text.clone())),
            Self::ToolUse(call) => Some(Self::ToolUse(call.clone())),
            Self::MessageEnd => Some(Self::MessageEnd),
            Self::Error(_) => None,
        }
    }
}
