use log::warn;

/// A tool-use block whose input fragments have all arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToolUse {
    pub id: String,
    pub name: String,
    pub partial_json: String,
}

/// Buffers `input_json_delta` fragments of the tool-use block in flight.
///
/// The API streams content blocks strictly one after another, so at most one
/// tool call is ever being accumulated. Several calls in one assistant turn
/// go through successive start/complete cycles.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ToolAccumulator {
    #[default]
    Idle,
    Accumulating {
        id: String,
        name: String,
        buffer: String,
    },
}

impl ToolAccumulator {
    pub const fn new() -> Self {
        Self::Idle
    }

    /// Begins a new tool call; an unfinished one is discarded.
    pub fn start(&mut self, id: impl Into<String>, name: impl Into<String>) {
        if let Self::Accumulating { id: previous, .. } = self {
            warn!("[Claude] tool use {previous} replaced before its block stopped");
        }
        *self = Self::Accumulating {
            id: id.into(),
            name: name.into(),
            buffer: String::new(),
        };
    }

    /// Appends an input fragment. Ignored while idle.
    pub fn append(&mut self, fragment: &str) {
        match self {
            Self::Accumulating { buffer, .. } => buffer.push_str(fragment),
            Self::Idle => warn!("[Claude] input fragment outside of a tool use block ignored"),
        }
    }

    /// Finishes the call in flight, returning to idle.
    pub fn complete(&mut self) -> Option<PartialToolUse> {
        match std::mem::take(self) {
            Self::Accumulating { id, name, buffer } => Some(PartialToolUse {
                id,
                name,
                partial_json: buffer,
            }),
            Self::Idle => None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    pub const fn is_accumulating(&self) -> bool {
        matches!(self, Self::Accumulating { .. })
    }
}
