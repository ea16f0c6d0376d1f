pub mod cli;
pub mod core;
pub mod eventsource;
pub mod providers;
pub mod tools;

pub use crate::core::{Config, ConversationManager, ConversationStore, InMemoryHistory, LLMError, TurnOutcome};
pub use providers::{ChatRequest, ClaudeClient, LLMClient, Message, StreamEvent};
