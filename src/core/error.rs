use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// Malformed endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Transport returned something that is not a usable HTTP response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Vendor-reported errors (non-200 status or an `error` stream event)
    #[error("API error: {0}")]
    ApiError(String),
    /// Connectivity errors (DNS, TLS, reset, body read failures)
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// No body chunk arrived within the idle timeout
    #[error("Stream stalled: no data received for {0:?}")]
    StreamTimeout(Duration),
    /// Malformed JSON where JSON was mandatory
    #[error("Failed to encode or decode JSON: {0}")]
    Decoding(serde_json::Error),
    /// Tool execution errors
    #[error("Tool error: {0}")]
    ToolError(ToolError),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
}

impl LLMError {
    /// Whether the caller may reasonably retry the turn.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ApiError(_) | Self::Network(_) | Self::StreamTimeout(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found error
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    /// Tool execution error
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
    /// Tool not enabled error
    #[error("Tool calls not enabled but llm tried to call a tool: {0}")]
    ToolCallsDisabled(String),
    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ToolError> for LLMError {
    fn from(err: ToolError) -> Self {
        Self::ToolError(err)
    }
}

impl From<std::io::Error> for LLMError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err)
    }
}

impl From<config::ConfigError> for LLMError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_keeps_message() {
        let err = LLMError::ApiError("status 429: rate limited".to_string());
        assert_eq!(err.to_string(), "API error: status 429: rate limited");
    }

    #[test]
    fn test_retryable_classes() {
        assert!(LLMError::ApiError("overloaded".into()).is_retryable());
        assert!(LLMError::StreamTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!LLMError::InvalidUrl("nope".into()).is_retryable());
        assert!(!LLMError::ConfigError("missing".into()).is_retryable());
    }

    #[test]
    fn test_tool_error_converts() {
        let err: LLMError = ToolError::ToolNotFound("web_search".into()).into();
        assert!(matches!(err, LLMError::ToolError(ToolError::ToolNotFound(_))));
    }
}
