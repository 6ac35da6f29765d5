use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

/// One message of a conversation, as stored and as sent to the model.
///
/// Stored records only require `role` and `content`; the optional fields are
/// filled in for assistant replies and omitted from JSON when empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "super::deserialize_nullable_string")]
    pub content: String,
    /// Model reasoning that accompanied the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Tool calls requested by the model, kept as opaque JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
    /// Inline error annotations collected while the reply streamed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ChatMessage {
    /// Create a message with the given role and text.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The form of this message sent back to the model as history.
    ///
    /// Reasoning and local error annotations are not part of the prompt.
    pub fn to_request_message(&self) -> Self {
        Self {
            role: self.role,
            content: self.content.clone(),
            thinking: None,
            tool_calls: self.tool_calls.clone(),
            errors: Vec::new(),
        }
    }
}
