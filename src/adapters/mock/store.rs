//! In-memory conversation store for testing.
//!
//! Mirrors the upsert rules of the conversation service: a missing id gets
//! a fresh one, a missing title becomes "Untitled", `created_at` is kept
//! when given and `updated_at` is always refreshed.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use crate::error::{ChatError, ChatResult};
use crate::models::{Conversation, ConversationSummary, DEFAULT_TITLE};
use crate::traits::ConversationStore;

/// In-memory conversation store for testing.
///
/// # Example
///
/// ```ignore
/// use ollama_chat::adapters::mock::InMemoryStore;
/// use ollama_chat::models::Conversation;
/// use ollama_chat::traits::ConversationStore;
///
/// let store = InMemoryStore::new();
/// let saved = store.save(&Conversation::new()).await?;
/// assert_eq!(saved.title, "Untitled");
/// assert!(store.get(&saved.id).await?.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Stored conversations, in first-save order
    conversations: Arc<Mutex<Vec<Conversation>>>,
    save_should_fail: Arc<Mutex<bool>>,
    save_count: Arc<Mutex<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding these conversations, stored as given.
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        let store = Self::new();
        *store.conversations.lock().unwrap() = conversations;
        store
    }

    /// Configure whether save should fail.
    pub fn set_save_should_fail(&self, should_fail: bool) {
        *self.save_should_fail.lock().unwrap() = should_fail;
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }

    /// Get a stored conversation synchronously (for testing).
    pub fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn list(&self) -> ChatResult<Vec<ConversationSummary>> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .map(Conversation::summary)
            .collect())
    }

    async fn get(&self, id: &str) -> ChatResult<Option<Conversation>> {
        Ok(self.get_conversation(id))
    }

    async fn save(&self, conversation: &Conversation) -> ChatResult<Conversation> {
        if *self.save_should_fail.lock().unwrap() {
            return Err(ChatError::Store("Mock save failure".to_string()));
        }

        let now = Utc::now();
        let mut stored = conversation.clone();
        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().simple().to_string();
        }
        if stored.title.is_empty() {
            stored.title = DEFAULT_TITLE.to_string();
        }
        stored.created_at = stored.created_at.or(Some(now));
        stored.updated_at = Some(now);

        let mut conversations = self.conversations.lock().unwrap();
        match conversations.iter_mut().find(|c| c.id == stored.id) {
            Some(existing) => *existing = stored.clone(),
            None => conversations.push(stored.clone()),
        }
        *self.save_count.lock().unwrap() += 1;
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> ChatResult<bool> {
        let mut conversations = self.conversations.lock().unwrap();
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        Ok(conversations.len() != before)
    }
}
