pub mod messages;
pub mod request;
pub mod stream_event;

pub use messages::{ContentBlock, Message, Role};
pub use request::ChatRequest;
pub use stream_event::StreamEvent;
