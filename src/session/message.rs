//! The assistant message accumulator and the updates it produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionState;
use crate::error::StreamError;
use crate::ndjson::ProtocolEvent;

/// What kind of problem an inline annotation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// A line that was not a valid chat chunk. The stream went on.
    MalformedLine,
    /// An in-band `error` sent by the model server. The stream went on.
    Upstream,
    /// The connection failed or ended early. The stream stopped.
    Transport,
    /// A line exceeded the decoder limit. The stream stopped.
    Framing,
}

/// A visible, non-content note attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub message: String,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Annotation for a stream error, worded with
    /// [`StreamError::user_message`]. Cancellation is silent and has none.
    pub fn from_error(error: &StreamError) -> Option<Self> {
        let kind = match error {
            StreamError::Framing { .. } => AnnotationKind::Framing,
            StreamError::Parse { .. } => AnnotationKind::MalformedLine,
            StreamError::Protocol { .. } => AnnotationKind::Upstream,
            StreamError::Transport { .. } => AnnotationKind::Transport,
            StreamError::Cancelled => return None,
        };
        Some(Self::new(kind, error.user_message()))
    }

    /// Whether the annotation ended the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, AnnotationKind::Transport | AnnotationKind::Framing)
    }
}

/// One change to a session, as seen by its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// Text was appended. `content` is the whole text so far.
    Text { delta: String, content: String },
    /// Reasoning was appended. `thinking` is the whole reasoning so far.
    Reasoning { delta: String, thinking: String },
    /// Tool calls arrived.
    ToolCalls { calls: Vec<Value> },
    Annotation(Annotation),
    /// The session reached a terminal state. Always the last update.
    Finished(SessionState),
}

/// Accumulated assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
    pub thinking: String,
    pub tool_calls: Vec<Value>,
    pub annotations: Vec<Annotation>,
}

impl AssistantMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one protocol event and return the update to report, if any.
    ///
    /// Empty text and reasoning deltas change nothing visible and are not
    /// reported. `Done` carries no content; the session handles it.
    pub fn apply(&mut self, event: &ProtocolEvent) -> Option<StreamUpdate> {
        match event {
            ProtocolEvent::TextDelta { content } => {
                if content.is_empty() {
                    return None;
                }
                self.content.push_str(content);
                Some(StreamUpdate::Text {
                    delta: content.clone(),
                    content: self.content.clone(),
                })
            }
            ProtocolEvent::ReasoningDelta { content } => {
                if content.is_empty() {
                    return None;
                }
                self.thinking.push_str(content);
                Some(StreamUpdate::Reasoning {
                    delta: content.clone(),
                    thinking: self.thinking.clone(),
                })
            }
            ProtocolEvent::ToolCallDelta { calls } => {
                self.tool_calls.extend(calls.iter().cloned());
                Some(StreamUpdate::ToolCalls {
                    calls: calls.clone(),
                })
            }
            ProtocolEvent::MalformedLine { raw } => self.report(&StreamError::Parse {
                raw: truncate(raw, 200),
            }),
            ProtocolEvent::UpstreamError { message } => self.report(&StreamError::Protocol {
                message: message.clone(),
            }),
            ProtocolEvent::Done => None,
        }
    }

    /// Record a stream error as an annotation. `None` for cancellation.
    pub fn report(&mut self, error: &StreamError) -> Option<StreamUpdate> {
        Annotation::from_error(error).map(|annotation| self.annotate(annotation))
    }

    /// Append an annotation and return the matching update.
    pub fn annotate(&mut self, annotation: Annotation) -> StreamUpdate {
        self.annotations.push(annotation.clone());
        StreamUpdate::Annotation(annotation)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
            && self.thinking.is_empty()
            && self.tool_calls.is_empty()
            && self.annotations.is_empty()
    }

    /// Annotation texts, in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.annotations.iter().map(|a| a.message.clone()).collect()
    }
}

fn truncate(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &raw[..idx]),
        None => raw.to_string(),
    }
}
