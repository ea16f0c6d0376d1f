use crate::providers::Message;

/// Conversation history owned by the host application.
///
/// The conversation loop reads the full history when it builds a request and
/// appends the assistant's replies after each turn. It never removes messages.
pub trait ConversationStore: Send {
    fn append(&mut self, message: Message);

    fn all_messages(&self) -> Vec<Message>;
}

/// Volatile history used by the command-line host and in tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    messages: Vec<Message>,
}

impl InMemoryHistory {
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl From<Vec<Message>> for InMemoryHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl ConversationStore for InMemoryHistory {
    fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn all_messages(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
