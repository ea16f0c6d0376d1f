pub mod config;
pub mod conversation;
pub mod error;
pub mod history;

pub use config::{ClaudeConfig, Config, WebSearchConfig};
pub use conversation::{ConversationManager, TurnOutcome};
pub use error::{LLMError, ToolError};
pub use history::{ConversationStore, InMemoryHistory};
