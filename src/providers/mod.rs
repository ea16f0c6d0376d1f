pub mod claude;
pub mod llm;
pub mod types;

pub use claude::ClaudeClient;
pub use llm::{EventStream, LLMClient};
pub use types::{ChatRequest, ContentBlock, Message, Role, StreamEvent};
