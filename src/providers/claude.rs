pub mod accumulator;
pub mod client;
pub mod parser;
pub mod types;

pub use accumulator::ToolAccumulator;
pub use client::ClaudeClient;
pub use parser::EventParser;
