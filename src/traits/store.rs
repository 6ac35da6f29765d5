//! Conversation store trait abstraction.
//!
//! Conversations live in an external key-value service. The client only
//! needs list/get/upsert/delete, keyed by conversation id.

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::models::{Conversation, ConversationSummary};

/// Trait for conversation persistence.
///
/// Implementations include the HTTP-backed
/// [`ApiClient`](crate::api::ApiClient) and
/// [`InMemoryStore`](crate::adapters::mock::InMemoryStore) for tests.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// List summaries of every stored conversation.
    async fn list(&self) -> ChatResult<Vec<ConversationSummary>>;

    /// Load one conversation.
    ///
    /// # Returns
    /// - `Ok(Some(conversation))` if it exists
    /// - `Ok(None)` if the store has no conversation with this id
    async fn get(&self, id: &str) -> ChatResult<Option<Conversation>>;

    /// Insert or replace a conversation by id.
    ///
    /// Returns the record as stored, with the store's timestamps filled in.
    async fn save(&self, conversation: &Conversation) -> ChatResult<Conversation>;

    /// Delete a conversation. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> ChatResult<bool>;
}
