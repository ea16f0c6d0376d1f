use std::sync::Arc;

use llm_chat::core::{Config, ConversationStore, InMemoryHistory, LLMError, TurnOutcome, WebSearchConfig};
use llm_chat::providers::{ContentBlock, Message, Role, StreamEvent};
use llm_chat::tools::{ToolRegistry, WebSearchTool};
use llm_chat::ConversationManager;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{claude_config, client, mount_once, sse_response, text_message, tool_use_message};

const SEARCH_PAGE: &str = r#"
    <div class="result">
      <a class="result__a" href="https://example.com/x">X explained</a>
      <a class="result__snippet" href="https://example.com/x">Everything about x.</a>
    </div>
"#;

fn config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.claude = claude_config(server);
    config.web_search = WebSearchConfig {
        endpoint: format!("{}/html/", server.uri()),
        max_results: 3,
        timeout_secs: 5,
    };
    config
}

fn manager(server: &MockServer) -> ConversationManager {
    let config = config(server);
    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new(&config.web_search).unwrap());
    ConversationManager::new(Arc::new(client(server)), &config).with_tools(registry)
}

async fn message_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/v1/messages")
        .map(|request| request.body_json().unwrap())
        .collect()
}

#[tokio::test]
async fn test_turn_persists_streamed_answer() {
    let server = MockServer::start().await;
    mount_once(&server, sse_response(&text_message(&["4", " is", " the answer"]))).await;

    let mut store = InMemoryHistory::from(vec![Message::user("What's 2+2?")]);
    let mut deltas = Vec::new();
    let outcome = manager(&server)
        .run_turn(&mut store, &CancellationToken::new(), |event| {
            if let StreamEvent::Text(text) = event {
                deltas.push(text.clone());
            }
        })
        .await
        .unwrap();

    assert_eq!(deltas, vec!["4", " is", " the answer"]);
    assert_eq!(
        outcome,
        TurnOutcome::Completed {
            text: "4 is the answer".to_string(),
            tool_hops: 0
        }
    );
    assert_eq!(store.last(), Some(&Message::assistant("4 is the answer")));
}

#[tokio::test]
async fn test_tool_continuation_round_trip() {
    let server = MockServer::start().await;
    mount_once(&server, sse_response(&tool_use_message("t1", &["{\"query\":", "\"x\"}"]))).await;
    mount_once(&server, sse_response(&text_message(&["X is explained at example.com."]))).await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .mount(&server)
        .await;

    let mut store = InMemoryHistory::from(vec![Message::user("search x")]);
    let outcome = manager(&server)
        .run_turn(&mut store, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { tool_hops: 1, .. }));

    let bodies = message_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["tools"][0]["name"], "web_search");

    let messages = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[1],
        json!({
            "role": "assistant",
            "content": [{"type": "tool_use", "id": "t1", "name": "web_search", "input": {"query": "x"}}]
        })
    );
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "t1");
    let result = messages[2]["content"][0]["content"].as_str().unwrap();
    assert!(result.starts_with("1. X explained\n   https://example.com/x"), "{result}");

    let persisted = store.all_messages();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[1].role, Role::Assistant);
    assert_eq!(persisted[1].text(), "X is explained at example.com.");
}

#[tokio::test]
async fn test_failed_search_is_reported_to_the_model() {
    let server = MockServer::start().await;
    mount_once(&server, sse_response(&tool_use_message("t1", &["{\"query\":\"x\"}"]))).await;
    mount_once(&server, sse_response(&text_message(&["I could not search."]))).await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut store = InMemoryHistory::from(vec![Message::user("search x")]);
    let outcome = manager(&server)
        .run_turn(&mut store, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    let bodies = message_bodies(&server).await;
    assert_eq!(
        bodies[1]["messages"][2]["content"][0],
        json!({
            "type": "tool_result",
            "tool_use_id": "t1",
            "content": "Search failed. Unable to retrieve results.",
            "is_error": true
        })
    );
}

#[tokio::test]
async fn test_rate_limited_turn_fails_without_persisting() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(429).set_body_string("rate limited")).await;

    let mut store = InMemoryHistory::from(vec![Message::user("hi")]);
    let result = manager(&server)
        .run_turn(&mut store, &CancellationToken::new(), |_| {})
        .await;

    assert!(matches!(result, Err(LLMError::ApiError(message)) if message == "status 429: rate limited"));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_spawned_turn_over_http() {
    use futures::StreamExt;

    let server = MockServer::start().await;
    mount_once(&server, sse_response(&text_message(&["hello", " there"]))).await;

    let store = InMemoryHistory::from(vec![Message::user("hi")]);
    let (events, handle) = manager(&server).spawn_turn(store, CancellationToken::new());
    let text: String = events
        .filter_map(|event| async move {
            match event {
                StreamEvent::Text(text) => Some(text),
                _ => None,
            }
        })
        .collect()
        .await;
    let (store, outcome) = handle.await.unwrap();

    assert_eq!(text, "hello there");
    assert!(matches!(outcome, Some(TurnOutcome::Completed { .. })));
    assert_eq!(
        store.last().map(|message| message.content.clone()),
        Some(vec![ContentBlock::text("hello there")])
    );
}
