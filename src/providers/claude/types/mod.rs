pub mod message;
pub mod request;
pub mod stream;

pub use message::{
    ContentBlock, ImageSource, Message, MessageContent, MessageResponse, StopReason, Usage,
};

pub use request::{ChatCompletionRequest, Tool};

pub use stream::{
    ContentBlockDeltaEvent, ContentBlockStartEvent, DeltaEvent, ErrorEvent, EventKind,
    MessageDeltaEvent, MessageStartEvent, StartBlock, StreamError,
};
