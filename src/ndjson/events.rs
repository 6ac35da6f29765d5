//! Protocol event types decoded from NDJSON chat lines.

use serde::{Deserialize, Serialize};

/// One semantic fact carried by a line of the chat stream.
///
/// A single line can carry several facets at once (text and tool calls, or
/// the last text fragment together with the completion flag), so the parser
/// returns an ordered `Vec<ProtocolEvent>` per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Fragment of assistant text to append. May be empty.
    TextDelta { content: String },
    /// Fragment of model reasoning ("thinking") to append.
    ReasoningDelta { content: String },
    /// Tool calls requested by the model, as opaque JSON values.
    ToolCallDelta { calls: Vec<serde_json::Value> },
    /// The stream completed successfully. Terminal.
    Done,
    /// The line could not be decoded. Recoverable.
    MalformedLine { raw: String },
    /// The line carried an in-band `error` from upstream. Recoverable: the
    /// server may still send a completion marker afterwards.
    UpstreamError { message: String },
}

impl ProtocolEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolEvent::Done)
    }
}
