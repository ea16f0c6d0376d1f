use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::core::error::ToolError;
use crate::core::WebSearchConfig;
use crate::tools::types::{Tool, ToolDefinition};

const TOOL_NAME: &str = "web_search";
const SEARCH_FAILED: &str = "Search failed. Unable to retrieve results.";
const QUERY_STRING_ERROR: &str = "query must be a non-empty string";
const USER_AGENT: &str = concat!("llm-chat/", env!("CARGO_PKG_VERSION"));

/// A single hit scraped from the search results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Searches the web through an HTML results page and returns the top hits as text
pub struct WebSearchTool {
    client: Client,
    endpoint: Url,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(config: &WebSearchConfig) -> Result<Self, ToolError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| ToolError::InvalidArgument(format!("invalid search endpoint: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            max_results: config.max_results,
        })
    }

    fn extract_query(input: &Value) -> Result<&str, ToolError> {
        input["query"]
            .as_str()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| ToolError::InvalidArgument(String::from(QUERY_STRING_ERROR)))
    }

    async fn fetch(&self, query: &str) -> Result<String, ToolError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", query);
        debug!("[Tools] web_search GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionError(format!(
                "search endpoint returned status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Searches the web and returns the titles, links and snippets of the top results. Use it for recent events or facts you are unsure about.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<String, ToolError> {
        let query = Self::extract_query(input)?;
        let html = self.fetch(query).await?;
        let results = parse_results(&html, self.max_results);
        debug!("[Tools] web_search '{query}' -> {} results", results.len());

        Ok(format_results(query, &results))
    }

    fn failure_message(&self, _error: &ToolError) -> String {
        SEARCH_FAILED.to_string()
    }
}

fn result_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
            .expect("valid result link regex")
    })
}

fn snippet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|span|td)>"#)
            .expect("valid snippet regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

/// Drops markup and decodes the handful of entities result pages use.
fn strip_html(fragment: &str) -> String {
    let text = tag_regex().replace_all(fragment, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result pages wrap targets in a redirect (`/l/?uddg=<encoded>`); unwrap it when present.
fn resolve_link(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let snippets: Vec<String> = snippet_regex()
        .captures_iter(html)
        .map(|caps| strip_html(&caps[1]))
        .collect();

    result_link_regex()
        .captures_iter(html)
        .enumerate()
        .map(|(i, caps)| SearchResult {
            title: strip_html(&caps[2]),
            url: resolve_link(&caps[1]),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
        })
        .filter(|result| !result.title.is_empty())
        .take(max_results)
        .collect()
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\".");
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "{}. {}\n   {}\n   {}",
                i + 1,
                result.title,
                result.url,
                result.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
