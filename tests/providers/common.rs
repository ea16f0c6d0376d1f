use llm_chat::core::ClaudeConfig;
use llm_chat::ClaudeClient;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MODEL: &str = "claude-3-5-haiku-20241022";

pub static MESSAGE_START: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "message_start",
        "message": {
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [],
            "model": MODEL,
            "stop_reason": null,
            "usage": { "input_tokens": 25, "output_tokens": 1 }
        }
    })
});

pub fn claude_config(server: &MockServer) -> ClaudeConfig {
    ClaudeConfig {
        base_url: format!("{}/v1", server.uri()),
        api_version: "2023-06-01".to_string(),
        default_model: MODEL.to_string(),
        max_tokens: 1024,
        connect_timeout_secs: 2,
        idle_timeout_secs: 5,
    }
}

pub fn client(server: &MockServer) -> ClaudeClient {
    ClaudeClient::new("test_api_key", &claude_config(server)).unwrap()
}

/// Renders `(event, payload)` pairs as an SSE body.
pub fn sse(events: &[(&str, Value)]) -> String {
    events
        .iter()
        .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
        .collect()
}

pub fn sse_response(events: &[(&str, Value)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse(events), "text/event-stream")
}

pub fn text_message(parts: &[&str]) -> Vec<(&'static str, Value)> {
    let mut events = vec![("message_start", MESSAGE_START.clone())];
    events.push((
        "content_block_start",
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
    ));
    for part in parts {
        events.push((
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": part}}),
        ));
    }
    events.push(("content_block_stop", json!({"type": "content_block_stop", "index": 0})));
    events.push((
        "message_delta",
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn", "stop_sequence": null}, "usage": {"output_tokens": 12}}),
    ));
    events.push(("message_stop", json!({"type": "message_stop"})));
    events
}

/// A reply that asks for one `web_search` call, its input split over several fragments.
pub fn tool_use_message(id: &str, fragments: &[&str]) -> Vec<(&'static str, Value)> {
    let mut events = vec![
        ("message_start", MESSAGE_START.clone()),
        (
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "tool_use", "id": id, "name": "web_search", "input": {}}}),
        ),
    ];
    for fragment in fragments {
        events.push((
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": fragment}}),
        ));
    }
    events.push(("content_block_stop", json!({"type": "content_block_stop", "index": 0})));
    events.push((
        "message_delta",
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use", "stop_sequence": null}}),
    ));
    events.push(("message_stop", json!({"type": "message_stop"})));
    events
}

pub async fn mount_once(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(response)
        .up_to_n_times(1)
        .mount(server)
        .await;
}
