//! Wire payload deserialization structs
//!
//! Shapes of single NDJSON objects sent by the chat backend. These are
//! internal; callers see [`ProtocolEvent`](super::ProtocolEvent) and
//! [`PullEvent`](super::PullEvent).

use serde::Deserialize;

/// One chat or generate chunk.
///
/// `{message?: {content?, thinking?, tool_calls?}, error?, done?, response?, thinking?}`
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct ChunkPayload {
    #[serde(default)]
    pub message: Option<MessagePayload>,
    /// Usually a string; anything else is rendered as JSON text.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub done: Option<bool>,
    /// `/generate` puts its text here instead of under `message`.
    #[serde(default)]
    pub response: Option<String>,
    /// `/generate` reasoning.
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Nested assistant message fragment.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct MessagePayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

/// One model pull progress line.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct PullPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Render an `error` field as a message.
pub(crate) fn error_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
