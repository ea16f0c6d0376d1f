use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Your query to the LLM; starts an interactive session when omitted
    #[arg()]
    pub query: Vec<String>,

    /// Attach an image to the query (png, jpeg, gif or webp)
    #[arg(short, long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,

    /// Model to use instead of the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable tool usage
    #[arg(long)]
    pub enable_tools: Option<bool>,

    /// Maximum number of tool round-trips per turn
    #[arg(long)]
    pub max_tool_hops: Option<u32>,

    /// Load settings from this file instead of ./config.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// The query words joined back together, `None` when no query was given.
    pub fn query(&self) -> Option<String> {
        let query = self.query.join(" ");
        (!query.trim().is_empty()).then_some(query)
    }
}
