use crate::core::{ClaudeConfig, LLMError};
use crate::eventsource::EventSourceExt;
use crate::providers::llm::{EventStream, LLMClient};
use crate::providers::types::{ChatRequest, StreamEvent};
use async_stream::stream;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, StatusCode, Url,
};
use std::time::Duration;

use super::parser::EventParser;
use super::types::ChatCompletionRequest;

const EVENT_STREAM: &str = "text/event-stream";

/// Client for the Claude messages API
///
/// Stateless between calls: every [`ClaudeClient::stream_chat`] gets its own
/// parser and tool accumulator, so one client can serve any number of
/// conversations.
#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    idle_timeout: Duration,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key
    pub fn new(api_key: &str, config: &ClaudeConfig) -> Result<Self, LLMError> {
        let endpoint = messages_endpoint(&config.base_url)?;
        let headers = build_headers(api_key, &config.api_version)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| LLMError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            headers,
            idle_timeout: config.idle_timeout(),
        })
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn encode_request(request: &ChatRequest) -> Result<Vec<u8>, LLMError> {
        let body = ChatCompletionRequest::from(request).with_stream(true);
        serde_json::to_vec(&body).map_err(LLMError::Decoding)
    }
}

fn messages_endpoint(base_url: &str) -> Result<Url, LLMError> {
    let endpoint = format!("{}/messages", base_url.trim_end_matches('/'));
    let url = Url::parse(&endpoint).map_err(|e| LLMError::InvalidUrl(format!("{endpoint}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(LLMError::InvalidUrl(format!(
            "{endpoint}: unsupported scheme {scheme}"
        ))),
    }
}

/// Build headers for API requests
fn build_headers(api_key: &str, api_version: &str) -> Result<HeaderMap, LLMError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-api-key",
        HeaderValue::from_str(api_key)
            .map_err(|_| LLMError::ConfigError("API key is not a valid header value".to_string()))?,
    );
    headers.insert(
        "anthropic-version",
        HeaderValue::from_str(api_version)
            .map_err(|e| LLMError::ConfigError(format!("Invalid API version: {e}")))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM));
    Ok(headers)
}

impl LLMClient for ClaudeClient {
    /// Streams one chat completion.
    ///
    /// Yields `MessageStart`, then parsed events in arrival order, and ends right
    /// after the first `MessageEnd` or `Error`. If the body ends without a
    /// terminal event a `MessageEnd` is synthesized. A 200 reply that is not an
    /// event stream is an `InvalidResponse`. Dropping the stream closes the
    /// connection.
    fn stream_chat(&self, request: &ChatRequest) -> EventStream {
        debug!(
            "[Claude] POST {} model={} messages={} tools={}",
            self.endpoint,
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let body = Self::encode_request(request);
        let http = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone());
        let idle_timeout = self.idle_timeout;

        Box::pin(stream! {
            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    yield StreamEvent::Error(e);
                    return;
                }
            };

            let response = match tokio::time::timeout(idle_timeout, http.body(body).send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    yield StreamEvent::Error(LLMError::from(e));
                    return;
                }
                Err(_) => {
                    yield StreamEvent::Error(LLMError::StreamTimeout(idle_timeout));
                    return;
                }
            };

            let status = response.status();
            debug!("[Claude] response status {status}");
            if status != StatusCode::OK {
                let error_text = response.text().await.unwrap_or_default();
                yield StreamEvent::api_error(format!("status {}: {}", status.as_u16(), error_text.trim()));
                return;
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !content_type.starts_with(EVENT_STREAM) {
                let body = response.text().await.unwrap_or_default();
                yield StreamEvent::Error(LLMError::InvalidResponse(format!(
                    "expected {EVENT_STREAM}, got `{content_type}`: {}",
                    body.trim()
                )));
                return;
            }

            yield StreamEvent::MessageStart;

            let mut frames = response.frames();
            let mut parser = EventParser::new();

            loop {
                let next = match tokio::time::timeout(idle_timeout, frames.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("[Claude] no data for {idle_timeout:?}, abandoning stream");
                        yield StreamEvent::Error(LLMError::StreamTimeout(idle_timeout));
                        return;
                    }
                };

                match next {
                    Some(Ok(frame)) => {
                        if let Some(event) = parser.parse(&frame) {
                            let terminal = event.is_terminal();
                            yield event;
                            if terminal {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield StreamEvent::Error(LLMError::Network(e));
                        return;
                    }
                    None => break,
                }
            }

            if parser.has_pending_tool_use() {
                warn!("[Claude] stream closed inside a tool use block; partial input dropped");
            }
            warn!("[Claude] stream closed without a terminal event");
            yield StreamEvent::MessageEnd;
        })
    }
}
