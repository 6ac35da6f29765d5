//! Chat orchestration: one user turn from input to stored conversation.
//!
//! [`ChatOrchestrator::send`] appends the user message and an empty assistant
//! placeholder, drives one response (streamed or whole), keeps the
//! placeholder in step with every update and finally saves the conversation.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ChatError, ChatResult, StreamError};
use crate::models::{
    derive_title, ChatMessage, ChatRequest, Conversation, GenerationSettings, Role,
};
use crate::ndjson::{parse_value, ProtocolEvent};
use crate::session::{AssistantMessage, CancelHandle, SessionObserver, SessionState, StreamUpdate};
use crate::traits::{ConversationStore, HttpClient};

/// Result of one [`ChatOrchestrator::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub state: SessionState,
    /// Snapshot of the assistant reply at the terminal state.
    pub message: AssistantMessage,
}

/// Drives chat turns against the backend and persists the results.
pub struct ChatOrchestrator<C, S> {
    api: ApiClient<C>,
    store: S,
    default_model: Option<String>,
    /// Conversations with a response in progress.
    active: Mutex<HashSet<String>>,
}

impl<C, S> ChatOrchestrator<C, S>
where
    C: HttpClient,
    S: ConversationStore,
{
    pub fn new(api: ApiClient<C>, store: S) -> Self {
        Self {
            api,
            store,
            default_model: None,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Model used when neither the settings nor the conversation name one.
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    pub fn api(&self) -> &ApiClient<C> {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a response is in progress for the conversation.
    pub fn is_active(&self, conversation_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(conversation_id)
    }

    /// Send `user_text` and collect the assistant's reply.
    ///
    /// Blank text, a missing model and a concurrent send for the same
    /// conversation are rejected before the conversation is touched. Once the
    /// reply reaches a terminal state (including `Aborted` and `Failed`) the
    /// conversation is saved; a failed save is returned as
    /// [`ChatError::Store`] while `conversation` keeps the reply.
    pub async fn send<O>(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        settings: &GenerationSettings,
        cancel: &CancelHandle,
        observer: &mut O,
    ) -> ChatResult<SendOutcome>
    where
        O: SessionObserver + ?Sized,
    {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let model = settings
            .model
            .clone()
            .or_else(|| conversation.settings.model.clone())
            .or_else(|| self.default_model.clone())
            .ok_or(ChatError::MissingModel)?;
        if conversation.id.is_empty() {
            conversation.id = uuid::Uuid::new_v4().simple().to_string();
        }
        let _slot = self.claim(&conversation.id)?;

        let mut settings = settings.clone();
        settings.model = Some(model.clone());
        conversation.settings = settings.clone();
        if conversation.has_default_title() {
            conversation.title = derive_title(user_text);
        }

        let user_message = ChatMessage::user(user_text);
        let request = ChatRequest::new(
            model,
            request_history(conversation, &user_message),
            &settings,
        );
        conversation.messages.push(user_message);
        conversation.messages.push(ChatMessage::assistant(""));
        debug!(
            conversation = %conversation.id,
            model = %request.model,
            stream = settings.stream,
            "Sending chat turn"
        );

        let outcome = {
            let placeholder = conversation.messages.len() - 1;
            let mut mirror = Mirror {
                target: &mut conversation.messages[placeholder],
                inner: observer,
            };
            if settings.stream {
                self.run_streaming(&request, cancel, &mut mirror).await?
            } else {
                self.run_whole(&request, cancel, &mut mirror).await
            }
        };

        self.persist(conversation).await?;
        Ok(outcome)
    }

    async fn run_streaming<O>(
        &self,
        request: &ChatRequest,
        cancel: &CancelHandle,
        observer: &mut O,
    ) -> ChatResult<SendOutcome>
    where
        O: SessionObserver + ?Sized,
    {
        let mut session = self.api.new_session(cancel.clone());
        let state = self.api.stream_chat(request, &mut session, observer).await?;
        Ok(SendOutcome {
            state,
            message: session.into_message(),
        })
    }

    /// Non-streaming turn: one whole response applied at once.
    async fn run_whole<O>(
        &self,
        request: &ChatRequest,
        cancel: &CancelHandle,
        observer: &mut O,
    ) -> SendOutcome
    where
        O: SessionObserver + ?Sized,
    {
        let mut message = AssistantMessage::new();
        let response = if cancel.is_aborted() {
            None
        } else {
            tokio::select! {
                biased;
                _ = cancel.aborted() => None,
                response = self.api.chat_once(request) => Some(response),
            }
        };

        let state = match response {
            None => SessionState::Aborted,
            Some(Ok(value)) => {
                for event in parse_value(&value) {
                    if let ProtocolEvent::Done = event {
                        break;
                    }
                    if let Some(update) = message.apply(&event) {
                        observer.on_update(&update, &message);
                    }
                }
                SessionState::Completed
            }
            Some(Err(e)) => {
                warn!(error = %e, "Chat request failed");
                let error = StreamError::Transport {
                    message: e.to_string(),
                };
                if let Some(update) = message.report(&error) {
                    observer.on_update(&update, &message);
                }
                SessionState::Failed
            }
        };
        observer.on_update(&StreamUpdate::Finished(state), &message);
        SendOutcome { state, message }
    }

    async fn persist(&self, conversation: &mut Conversation) -> ChatResult<()> {
        let saved = self.store.save(conversation).await.map_err(|e| match e {
            ChatError::Store(_) => e,
            other => ChatError::Store(other.to_string()),
        })?;
        conversation.id = saved.id;
        conversation.created_at = saved.created_at;
        conversation.updated_at = saved.updated_at;
        if !saved.title.is_empty() {
            conversation.title = saved.title;
        }
        info!(conversation = %conversation.id, "Conversation saved");
        Ok(())
    }

    fn claim(&self, id: &str) -> ChatResult<ActiveSlot<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(id.to_string()) {
            return Err(ChatError::SessionActive(id.to_string()));
        }
        Ok(ActiveSlot {
            active: &self.active,
            id: id.to_string(),
        })
    }
}

/// Messages sent to the model: the system prompt, the prior history and the
/// new user message.
///
/// Assistant turns that produced nothing (an aborted or failed reply with no
/// text and no tool calls) are left out.
fn request_history(conversation: &Conversation, user_message: &ChatMessage) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.messages.len() + 2);
    if !conversation.system.trim().is_empty() {
        messages.push(ChatMessage::system(conversation.system.clone()));
    }
    messages.extend(
        conversation
            .messages
            .iter()
            .filter(|m| !is_empty_reply(m))
            .map(ChatMessage::to_request_message),
    );
    messages.push(user_message.to_request_message());
    messages
}

fn is_empty_reply(message: &ChatMessage) -> bool {
    message.role == Role::Assistant
        && message.content.is_empty()
        && message.tool_calls.as_ref().map_or(true, Vec::is_empty)
}

/// Releases a conversation's active slot when dropped.
struct ActiveSlot<'a> {
    active: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Copies each update into the stored assistant message, then forwards it.
struct Mirror<'a, O: ?Sized> {
    target: &'a mut ChatMessage,
    inner: &'a mut O,
}

impl<O> SessionObserver for Mirror<'_, O>
where
    O: SessionObserver + ?Sized,
{
    fn on_update(&mut self, update: &StreamUpdate, message: &AssistantMessage) {
        match update {
            StreamUpdate::Text { delta, .. } => self.target.content.push_str(delta),
            StreamUpdate::Reasoning { delta, .. } => self
                .target
                .thinking
                .get_or_insert_with(String::new)
                .push_str(delta),
            StreamUpdate::ToolCalls { calls } => self
                .target
                .tool_calls
                .get_or_insert_with(Vec::new)
                .extend(calls.iter().cloned()),
            StreamUpdate::Annotation(annotation) => {
                self.target.errors.push(annotation.message.clone())
            }
            StreamUpdate::Finished(_) => {}
        }
        self.inner.on_update(update, message);
    }
}
