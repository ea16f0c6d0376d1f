use futures::Stream;
use std::pin::Pin;

use super::types::{ChatRequest, StreamEvent};

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'static>>;

pub trait LLMClient: Send + Sync {
    /// Start a streaming chat call.
    ///
    /// Nothing is sent until the stream is first polled. Failures are reported
    /// in-band as a terminal [`StreamEvent::Error`], never by ending early.
    fn stream_chat(&self, request: &ChatRequest) -> EventStream;
}
