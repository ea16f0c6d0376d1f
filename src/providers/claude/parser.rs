use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::eventsource::Frame;
use crate::providers::types::StreamEvent;
use crate::tools::ToolCall;

use super::accumulator::{PartialToolUse, ToolAccumulator};
use super::types::{
    ContentBlockDeltaEvent, ContentBlockStartEvent, DeltaEvent, ErrorEvent, EventKind,
    MessageDeltaEvent, MessageStartEvent, StartBlock,
};

/// Turns decoded SSE frames into [`StreamEvent`]s.
///
/// Owns the tool accumulator for one streaming call; create a fresh parser per
/// request. Frames that cannot be understood are skipped rather than failing
/// the stream.
#[derive(Debug, Default)]
pub struct EventParser {
    accumulator: ToolAccumulator,
}

impl EventParser {
    pub const fn new() -> Self {
        Self {
            accumulator: ToolAccumulator::new(),
        }
    }

    pub fn parse(&mut self, frame: &Frame) -> Option<StreamEvent> {
        let payload = serde_json::from_str::<Value>(&frame.data).ok();

        // Data-only frames fall back to the payload's own `type` field
        let kind = frame
            .event_type
            .as_deref()
            .or_else(|| payload.as_ref()?.get("type")?.as_str())
            .map_or(EventKind::Unknown, EventKind::from);

        match kind {
            // Payload-free events
            EventKind::ContentBlockStop => {
                return self.accumulator.complete().map(|partial| {
                    StreamEvent::ToolUse(finish_tool_use(partial))
                })
            }
            EventKind::MessageStop => return Some(StreamEvent::MessageEnd),
            EventKind::Ping => return None,
            EventKind::Unknown => {
                debug!("[Claude] ignoring unrecognized event: {frame}");
                return None;
            }
            _ => {}
        }

        let Some(payload) = payload else {
            debug!("[Claude] skipping frame with unparseable data: {frame}");
            return None;
        };

        match kind {
            EventKind::MessageStart => {
                if let Some(start) = decode::<MessageStartEvent>(payload) {
                    debug!(
                        "[Claude] message {} started on {} ({} input tokens)",
                        start.message.id, start.message.model, start.message.usage.input_tokens
                    );
                }
                None
            }
            EventKind::ContentBlockStart => {
                let start = decode::<ContentBlockStartEvent>(payload)?;
                match start.content_block {
                    StartBlock::ToolUse { id, name } => {
                        debug!("[Claude] tool use {id} ({name}) started at block {}", start.index);
                        self.accumulator.start(id, name);
                    }
                    StartBlock::Other => self.accumulator.reset(),
                }
                None
            }
            EventKind::ContentBlockDelta => match decode::<ContentBlockDeltaEvent>(payload)?.delta {
                DeltaEvent::TextDelta { text } => Some(StreamEvent::Text(text)),
                DeltaEvent::InputJsonDelta { partial_json } => {
                    self.accumulator.append(&partial_json);
                    None
                }
                DeltaEvent::Other => None,
            },
            EventKind::MessageDelta => {
                let stop_reason = decode::<MessageDeltaEvent>(payload)?.delta.stop_reason?;
                debug!("[Claude] stop reason: {stop_reason:?}");
                Some(StreamEvent::MessageEnd)
            }
            EventKind::Error => {
                let error = decode::<ErrorEvent>(payload)?.error;
                warn!("[Claude] stream error event ({}): {}", error.error_type, error.message);
                Some(StreamEvent::api_error(error.message))
            }
            EventKind::ContentBlockStop
            | EventKind::MessageStop
            | EventKind::Ping
            | EventKind::Unknown => None,
        }
    }

    pub const fn has_pending_tool_use(&self) -> bool {
        self.accumulator.is_accumulating()
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Option<T> {
    serde_json::from_value(payload)
        .map_err(|e| debug!("[Claude] skipping malformed event payload: {e}"))
        .ok()
}

/// Parses the buffered input. Tool input must be an object; anything else becomes `{}`
/// so the call can still be answered.
fn finish_tool_use(partial: PartialToolUse) -> ToolCall {
    let PartialToolUse {
        id,
        name,
        partial_json,
    } = partial;

    let input = if partial_json.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_str::<Value>(&partial_json) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                warn!("[Claude] tool {name} input is not an object: {other}");
                Value::Object(Map::new())
            }
            Err(e) => {
                warn!("[Claude] tool {name} input is not valid JSON ({e}): {partial_json}");
                Value::Object(Map::new())
            }
        }
    };

    debug!("[Claude] tool use {id} complete: {name}({input})");
    ToolCall::new(id, name, input)
}
