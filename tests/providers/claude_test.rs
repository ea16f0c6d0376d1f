use futures::StreamExt;
use llm_chat::core::LLMError;
use llm_chat::providers::{ChatRequest, LLMClient, Message, StreamEvent};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, mount_once, sse_response, text_message, tool_use_message, MODEL};

fn request(text: &str) -> ChatRequest {
    ChatRequest::new(MODEL, 1024, vec![Message::user(text)])
}

#[tokio::test]
async fn test_claude_streams_text_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test_api_key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"stream": true, "model": MODEL})))
        .respond_with(sse_response(&text_message(&["4", " is", " the answer"])))
        .mount(&server)
        .await;

    let events: Vec<StreamEvent> = client(&server).stream_chat(&request("What's 2+2?")).collect().await;

    assert!(matches!(events.first(), Some(StreamEvent::MessageStart)));
    let text: String = events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "4 is the answer");

    let ends = events.iter().filter(|e| matches!(e, StreamEvent::MessageEnd)).count();
    assert_eq!(ends, 1);
    assert!(matches!(events.last(), Some(StreamEvent::MessageEnd)));
}

#[tokio::test]
async fn test_claude_accumulates_tool_input() {
    let server = MockServer::start().await;
    mount_once(
        &server,
        sse_response(&tool_use_message("t1", &["{\"quer", "y\":\"cat", "s\"}"])),
    )
    .await;

    let events: Vec<StreamEvent> = client(&server).stream_chat(&request("cats?")).collect().await;
    let calls: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::ToolUse(call) => Some(call),
            _ => None,
        })
        .collect();

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "t1");
    assert_eq!(calls[0].name, "web_search");
    assert_eq!(calls[0].input, json!({"query": "cats"}));
}

#[tokio::test]
async fn test_claude_rate_limited() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(429).set_body_string("rate limited")).await;

    let events: Vec<StreamEvent> = client(&server).stream_chat(&request("hi")).collect().await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(error @ LLMError::ApiError(message)) => {
            assert_eq!(message, "status 429: rate limited");
            assert!(error.is_retryable());
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_claude_connection_dropped_mid_stream() {
    let server = MockServer::start().await;
    let mut events = text_message(&["partial"]);
    // Cut the body before message_delta and message_stop
    events.truncate(3);
    mount_once(&server, sse_response(&events)).await;

    let events: Vec<StreamEvent> = client(&server).stream_chat(&request("hi")).collect().await;

    let ends = events.iter().filter(|e| matches!(e, StreamEvent::MessageEnd)).count();
    assert_eq!(ends, 1);
    assert!(matches!(events.last(), Some(StreamEvent::MessageEnd)));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Text(t) if t == "partial")));
}

#[tokio::test]
async fn test_claude_ignores_unknown_events() {
    let server = MockServer::start().await;
    let body = format!(
        "event: ping\ndata: {{\"type\": \"ping\"}}\n\nevent: something_new\r\ndata: {{\"type\": \"something_new\"}}\r\n\r\n{}",
        crate::common::sse(&text_message(&["ok"]))
    );
    mount_once(
        &server,
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
    )
    .await;

    let events: Vec<StreamEvent> = client(&server).stream_chat(&request("hi")).collect().await;
    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            StreamEvent::MessageStart => "start",
            StreamEvent::Text(_) => "text",
            StreamEvent::ToolUse(_) => "tool",
            StreamEvent::MessageEnd => "end",
            StreamEvent::Error(_) => "error",
        })
        .collect();
    assert_eq!(kinds, vec!["start", "text", "end"]);
}

#[tokio::test]
async fn test_claude_sends_system_and_tools() {
    let server = MockServer::start().await;
    mount_once(&server, sse_response(&text_message(&["hi"]))).await;

    let tool = llm_chat::tools::ToolDefinition {
        name: "web_search".to_string(),
        description: "Search the web".to_string(),
        input_schema: json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]}),
    };
    let request = request("hello")
        .with_system(Some("Be brief.".to_string()))
        .with_tools(vec![tool]);
    let _: Vec<StreamEvent> = client(&server).stream_chat(&request).collect().await;

    let received = server.received_requests().await.unwrap();
    let body: Value = received[0].body_json().unwrap();
    assert_eq!(body["system"], "Be brief.");
    assert_eq!(body["tools"][0]["name"], "web_search");
    assert_eq!(body["tools"][0]["input_schema"]["required"], json!(["query"]));
    assert_eq!(body["messages"], json!([{"role": "user", "content": "hello"}]));
}
