//! Conversation store over the backend's `/conversations` routes.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{json_headers, ApiClient};
use crate::error::ChatResult;
use crate::models::{Conversation, ConversationSummary};
use crate::traits::{ConversationStore, HttpClient};

impl<C: HttpClient> ApiClient<C> {
    fn conversation_url(&self, id: &str) -> String {
        self.url(&format!("conversations/{}", urlencoding::encode(id)))
    }
}

#[async_trait]
impl<C: HttpClient> ConversationStore for ApiClient<C> {
    async fn list(&self) -> ChatResult<Vec<ConversationSummary>> {
        self.get_json("conversations").await
    }

    async fn get(&self, id: &str) -> ChatResult<Option<Conversation>> {
        let response = self
            .http()
            .get(&self.conversation_url(id), &json_headers())
            .await?;
        if response.status == 404 {
            debug!(id, "Conversation not found");
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json()?))
    }

    async fn save(&self, conversation: &Conversation) -> ChatResult<Conversation> {
        let saved: Conversation = self.post_json("conversations", conversation).await?;
        info!(id = %saved.id, messages = saved.messages.len(), "Saved conversation");
        Ok(saved)
    }

    async fn delete(&self, id: &str) -> ChatResult<bool> {
        let response = self
            .http()
            .delete(&self.conversation_url(id), &json_headers())
            .await?;
        if response.status == 404 {
            return Ok(false);
        }
        response.error_for_status()?;
        info!(id, "Deleted conversation");
        Ok(true)
    }
}
