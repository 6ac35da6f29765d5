//! Conversation records as kept by the conversation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_nullable_string, ChatMessage, GenerationSettings};

/// Title the store assigns when none is given.
pub const DEFAULT_TITLE: &str = "Untitled";

/// A full conversation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Conversation {
    /// Empty until the conversation is first saved or sent.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// System prompt; sent as a leading system message when non-empty.
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub system: String,
    #[serde(default)]
    pub settings: GenerationSettings,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Whether the title still needs to be derived from the content.
    pub fn has_default_title(&self) -> bool {
        let title = self.title.trim();
        title.is_empty() || title == DEFAULT_TITLE
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Index entry returned by `GET /conversations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConversationSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
