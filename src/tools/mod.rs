pub mod registry;
pub mod types;
pub mod web_search;

pub use registry::ToolRegistry;
pub use types::*;
pub use web_search::WebSearchTool;
