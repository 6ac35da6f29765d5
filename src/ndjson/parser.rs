//! Chat line parsing
//!
//! Maps one decoded line to the ordered protocol events it carries. Parsing
//! is total: anything that is not a chat chunk becomes
//! [`ProtocolEvent::MalformedLine`] instead of an error.

use serde::Deserialize;

use crate::ndjson::events::ProtocolEvent;
use crate::ndjson::payloads::{error_text, ChunkPayload};

/// Parse one NDJSON line into protocol events.
///
/// Blank lines produce no events. Facets come out in a fixed order:
/// upstream error, reasoning, text, tool calls, completion.
pub fn parse_line(line: &str) -> Vec<ProtocolEvent> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<ChunkPayload>(line) {
        Ok(payload) => events_from_payload(payload),
        Err(e) => {
            tracing::trace!(error = %e, "malformed chat line");
            vec![ProtocolEvent::MalformedLine {
                raw: line.to_string(),
            }]
        }
    }
}

/// Parse an already-decoded JSON value, such as a non-streaming response body.
pub fn parse_value(value: &serde_json::Value) -> Vec<ProtocolEvent> {
    match ChunkPayload::deserialize(value) {
        Ok(payload) => events_from_payload(payload),
        Err(_) => vec![ProtocolEvent::MalformedLine {
            raw: value.to_string(),
        }],
    }
}

fn events_from_payload(payload: ChunkPayload) -> Vec<ProtocolEvent> {
    let mut events = Vec::new();

    if let Some(error) = payload.error.as_ref() {
        events.push(ProtocolEvent::UpstreamError {
            message: error_text(error),
        });
    }

    let message = payload.message.unwrap_or_default();

    if let Some(thinking) = message.thinking.or(payload.thinking) {
        events.push(ProtocolEvent::ReasoningDelta { content: thinking });
    }

    if let Some(content) = message.content.or(payload.response) {
        events.push(ProtocolEvent::TextDelta { content });
    }

    if let Some(calls) = message.tool_calls {
        if !calls.is_empty() {
            events.push(ProtocolEvent::ToolCallDelta { calls });
        }
    }

    if payload.done == Some(true) {
        events.push(ProtocolEvent::Done);
    }

    events
}
