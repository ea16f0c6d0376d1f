use std::sync::Arc;

use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::core::{error::ToolError, history::ConversationStore, Config, LLMError};
use crate::providers::{ChatRequest, ContentBlock, LLMClient, Message, StreamEvent};
use crate::tools::{ToolCall, ToolDefinition, ToolExecutor};

/// How a user turn ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model finished without requesting another tool
    Completed { text: String, tool_hops: u32 },
    /// The model kept requesting tools after the hop budget was spent
    HopLimitReached { text: String, tool_hops: u32 },
    /// The caller cancelled the turn; nothing further was emitted or persisted
    Cancelled,
}

/// Drives one user turn against the model, answering tool calls until the model
/// produces a final reply.
///
/// The manager is cheap to clone and holds no per-turn state; the conversation
/// itself lives in the [`ConversationStore`] handed to each turn.
#[derive(Clone)]
pub struct ConversationManager {
    client: Arc<dyn LLMClient>,
    tools: Option<Arc<dyn ToolExecutor>>,
    model: String,
    max_tokens: u32,
    system_prompt: Option<String>,
    max_tool_hops: u32,
}

impl ConversationManager {
    /// Creates a new `ConversationManager` using the model settings from `config`.
    ///
    /// Tools stay disabled until [`ConversationManager::with_tools`] is called.
    pub fn new(client: Arc<dyn LLMClient>, config: &Config) -> Self {
        Self {
            client,
            tools: None,
            model: config.get_model().to_string(),
            max_tokens: config.get_max_tokens(),
            system_prompt: config.system_prompt.clone(),
            max_tool_hops: config.max_tool_hops,
        }
    }

    pub fn with_tools(mut self, tools: impl ToolExecutor + 'static) -> Self {
        self.tools = Some(Arc::new(tools));
        self
    }

    pub const fn with_max_tool_hops(mut self, max_tool_hops: u32) -> Self {
        self.max_tool_hops = max_tool_hops;
        self
    }

    /// Runs one user turn over the messages currently in `store`.
    ///
    /// Every streamed event is passed to `on_event` in arrival order, including a
    /// terminal `Error`, which is then also returned. Assistant text is appended
    /// to `store`: text streamed ahead of a tool call as its own message, the
    /// final reply once the model stops, and partial text when the stream fails.
    /// Tool-use and tool-result messages only live in the request history of
    /// this turn.
    ///
    /// # Returns
    /// * `Result<TurnOutcome, LLMError>` - How the turn ended, or the stream error that ended it
    pub async fn run_turn<S, F>(
        &self,
        store: &mut S,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<TurnOutcome, LLMError>
    where
        S: ConversationStore + ?Sized,
        F: FnMut(&StreamEvent) + Send,
    {
        let mut messages = store.all_messages();
        let tool_definitions: Vec<ToolDefinition> = self
            .tools
            .as_ref()
            .map(|tools| tools.definitions())
            .unwrap_or_default();
        let mut state = TurnState::Idle;
        let mut tool_hops = 0;

        loop {
            state.advance(TurnState::Streaming);
            let request = ChatRequest::new(&self.model, self.max_tokens, messages.clone())
                .with_system(self.system_prompt.clone())
                .with_tools(tool_definitions.clone());
            let mut stream = self.client.stream_chat(&request);
            let mut reply = AssistantReply::default();

            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!("[Conversation] turn cancelled while streaming");
                        return Ok(TurnOutcome::Cancelled);
                    }
                    event = stream.next() => event,
                };

                let Some(event) = event else {
                    debug!("[Conversation] stream closed without a terminal event");
                    break;
                };

                on_event(&event);
                match event {
                    StreamEvent::MessageStart => {}
                    StreamEvent::Text(text) => reply.text.push_str(&text),
                    StreamEvent::ToolUse(call) => {
                        debug!("[Conversation] model requested {call}");
                        reply.tool_calls.push(call);
                    }
                    StreamEvent::MessageEnd => break,
                    StreamEvent::Error(error) => {
                        state.advance(TurnState::Failed);
                        if reply.has_text() {
                            store.append(Message::assistant(reply.text));
                        }
                        return Err(error);
                    }
                }
            }

            if reply.tool_calls.is_empty() {
                state.advance(TurnState::Completed);
                if reply.has_text() {
                    store.append(Message::assistant(reply.text.clone()));
                }
                return Ok(TurnOutcome::Completed {
                    text: reply.text,
                    tool_hops,
                });
            }

            state.advance(TurnState::AwaitingTool);
            if reply.has_text() {
                store.append(Message::assistant(reply.text.clone()));
            }

            if tool_hops >= self.max_tool_hops {
                warn!(
                    "[Conversation] tool hop limit of {} reached, ending turn",
                    self.max_tool_hops
                );
                return Ok(TurnOutcome::HopLimitReached {
                    text: reply.text,
                    tool_hops,
                });
            }

            state.advance(TurnState::ExecutingTool);
            let results = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("[Conversation] turn cancelled while executing tools");
                    return Ok(TurnOutcome::Cancelled);
                }
                results = self.handle_tool_calls(&reply.tool_calls) => results,
            };

            messages.push(Message::tool_use(&reply.text, reply.tool_calls));
            messages.push(Message::tool_results(results));
            tool_hops += 1;
            debug!("[Conversation] continuing after tool hop {tool_hops}");
        }
    }

    /// Runs a turn on its own task, delivering events through a channel.
    ///
    /// The stream ends after the terminal event. A failed turn delivers its
    /// `Error` on the stream and yields `None` from the handle, which also hands
    /// the store back. Dropping the stream cancels the turn.
    pub fn spawn_turn<S>(
        &self,
        mut store: S,
        cancel: CancellationToken,
    ) -> (
        UnboundedReceiverStream<StreamEvent>,
        JoinHandle<(S, Option<TurnOutcome>)>,
    )
    where
        S: ConversationStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = self.clone();

        let handle = tokio::spawn(async move {
            let on_drop = cancel.clone();
            let forward = tx.clone();
            let result = manager
                .run_turn(&mut store, &cancel, move |event| {
                    if let Some(event) = event.try_clone() {
                        if forward.send(event).is_err() {
                            on_drop.cancel();
                        }
                    }
                })
                .await;

            let outcome = match result {
                Ok(outcome) => Some(outcome),
                Err(error) => {
                    let _ = tx.send(StreamEvent::Error(error));
                    None
                }
            };
            (store, outcome)
        });

        (UnboundedReceiverStream::new(rx), handle)
    }

    /// Executes the requested tools in order and returns one result block per call.
    ///
    /// Failures become error results so the model can react to them.
    async fn handle_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<ContentBlock> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for tool_call in tool_calls {
            let block = match self.execute_tool(tool_call).await {
                Ok(content) => ContentBlock::tool_result(&tool_call.id, content),
                Err(error) => {
                    warn!("[Conversation] tool {tool_call} failed: {error}");
                    let content = self.tools.as_ref().map_or_else(
                        || error.to_string(),
                        |tools| tools.failure_result(&tool_call.name, &error),
                    );
                    ContentBlock::tool_error(&tool_call.id, content)
                }
            };
            results.push(block);
        }

        results
    }

    async fn execute_tool(&self, tool_call: &ToolCall) -> Result<String, ToolError> {
        let tools = self
            .tools
            .as_ref()
            .ok_or_else(|| ToolError::ToolCallsDisabled(tool_call.to_string()))?;
        tools.execute(&tool_call.name, &tool_call.input).await
    }
}

/// Text and tool calls collected from one streaming call.
#[derive(Debug, Default)]
struct AssistantReply {
    text: String,
    tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Idle,
    Streaming,
    AwaitingTool,
    ExecutingTool,
    Completed,
    Failed,
}

impl TurnState {
    fn advance(&mut self, next: Self) {
        debug!("[Conversation] {self:?} -> {next:?}");
        *self = next;
    }
}
