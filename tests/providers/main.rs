mod claude_test;
mod common;
mod conversation_test;
