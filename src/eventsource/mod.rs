use async_stream::try_stream;
use futures::{pin_mut, Stream, StreamExt};
use log::trace;
use reqwest::Response;
use serde::de::IgnoredAny;
use std::fmt::{self, Display, Formatter};
use std::pin::Pin;

const FIELD_SEPARATOR: char = ':';
const LINE_FEED: u8 = b'\n';

/// A decoded Server-Sent Event frame: the `event:` type (if any) and its `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Type of the event, absent for data-only frames
    pub event_type: Option<String>,
    /// The event payload; multiple `data:` lines are joined with `\n`
    pub data: String,
}

impl Frame {
    pub fn new(event_type: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.map(str::to_string),
            data: data.into(),
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {{ event_type: {:?}, data: {} }}",
            self.event_type, self.data
        )
    }
}

/// Incremental SSE decoder.
///
/// Two framings are accepted because vendor output varies between them:
///
/// - inline: an `event:` line followed by a `data:` line emits the frame as soon
///   as the data seen so far is a complete JSON value, without waiting for the
///   blank separator; JSON split over several `data:` lines waits for it;
/// - buffered: `data:` lines with no preceding `event:` accumulate until a blank
///   line (or the next `event:` line) closes the frame.
///
/// Lines may be split across chunks at any byte. The decoder never decides that
/// a stream is over; [`FrameDecoder::finish`] only flushes what is pending.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    line_buffer: Vec<u8>,
    event_type: Option<String>,
    data: Option<String>,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            line_buffer: Vec::new(),
            event_type: None,
            data: None,
        }
    }

    /// Feeds a chunk of raw bytes, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        self.line_buffer.extend_from_slice(chunk);

        while let Some(line_end) = self.line_buffer.iter().position(|&b| b == LINE_FEED) {
            let line: Vec<u8> = self.line_buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line[..line_end]);
            frames.extend(self.push_line(&line));
        }

        frames
    }

    /// Processes one complete line (without its terminator).
    pub fn push_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.take_frame();
        }

        if line.starts_with(FIELD_SEPARATOR) {
            return None;
        }

        let Some((field, value)) = line.split_once(FIELD_SEPARATOR) else {
            trace!("[SSE] ignoring line without field separator: {line}");
            return None;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => {
                // An unterminated data-only frame is closed by the next event line
                let pending = self.data.is_some().then(|| self.take_frame()).flatten();
                self.event_type = Some(value.to_string());
                pending
            }
            "data" => {
                match self.data.as_mut() {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => self.data = Some(value.to_string()),
                }

                // Inline framing: a typed frame closes once its data parses as JSON
                let complete = self.event_type.is_some()
                    && self.data.as_deref().is_some_and(is_complete_json);
                if complete {
                    self.take_frame()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Flushes any partial line and pending frame at end of input.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();

        if !self.line_buffer.is_empty() {
            let line = String::from_utf8_lossy(&std::mem::take(&mut self.line_buffer)).into_owned();
            frames.extend(self.push_line(&line));
        }

        frames.extend(self.take_frame());
        self.event_type = None;
        frames
    }

    fn take_frame(&mut self) -> Option<Frame> {
        match self.data.take() {
            Some(data) => Some(Frame {
                event_type: self.event_type.take(),
                data,
            }),
            None => {
                // An event with no data carries nothing to dispatch
                self.event_type = None;
                None
            }
        }
    }
}

fn is_complete_json(data: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(data).is_ok()
}

/// Decodes a stream of byte chunks into SSE frames, flushing the decoder when the input ends.
pub fn decode_frames<S, B, E>(stream: S) -> impl Stream<Item = Result<Frame, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        pin_mut!(stream);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for frame in decoder.feed(chunk.as_ref()) {
                yield frame;
            }
        }

        for frame in decoder.finish() {
            yield frame;
        }
    }
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, reqwest::Error>> + Send>>;

/// Extension trait for converting a Response into a Stream of SSE frames.
pub trait EventSourceExt {
    /// Converts the response body into a Stream of frames.
    fn frames(self) -> FrameStream;
}

impl EventSourceExt for Response {
    fn frames(self) -> FrameStream {
        Box::pin(decode_frames(self.bytes_stream()))
    }
}
