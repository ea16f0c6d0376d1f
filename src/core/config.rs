use crate::core::LLMError;
use config::{Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

const ENV_PREFIX: &str = "LLM_CHAT";

#[derive(Debug, Deserialize, Clone)]
pub struct ClaudeConfig {
    pub base_url: String,
    pub api_version: String,
    pub default_model: String,
    pub max_tokens: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl ClaudeConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub system_prompt: Option<String>,
    pub enable_tools: bool,
    pub max_tool_hops: u32,
    pub claude: ClaudeConfig,
    pub web_search: WebSearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Embedded defaults, then `./config.toml` if present, then `LLM_CHAT__*` env vars.
    pub fn load() -> Result<Self, LLMError> {
        let settings = config::Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::new("config.toml", FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads an explicit file layered over the embedded defaults.
    pub fn load_from(path: &Path) -> Result<Self, LLMError> {
        if !path.exists() {
            return Err(LLMError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.claude.default_model = model.into();
        self
    }

    pub fn get_model(&self) -> &str {
        &self.claude.default_model
    }

    pub const fn get_max_tokens(&self) -> u32 {
        self.claude.max_tokens
    }
}
