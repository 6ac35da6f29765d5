//! Client for the chat web backend.
//!
//! The backend fronts a local model server under one `/api` root:
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /models`, `GET /running` | installed and loaded models |
//! | `POST /pull` | download a model, NDJSON progress feed |
//! | `POST /chat`, `POST /generate` | NDJSON stream or one JSON body |
//! | `/conversations[/{id}]` | conversation store |
//!
//! All requests go through an [`HttpClient`], so the client runs against
//! [`MockHttpClient`](crate::adapters::mock::MockHttpClient) in tests.

mod pull;
mod store;

pub use pull::PullOutcome;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ChatResult;
use crate::models::{ChatRequest, GenerateRequest, ModelInfo, ModelList, RunningModel};
use crate::session::{CancelHandle, SessionObserver, SessionState, StreamSession};
use crate::traits::{Headers, HttpClient};

/// Default backend root.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Client for the backend's `/api` routes.
#[derive(Debug, Clone)]
pub struct ApiClient<C> {
    base_url: String,
    http: C,
    max_line_bytes: Option<usize>,
}

impl<C: HttpClient> ApiClient<C> {
    /// Create a client for the `/api` root at `base_url`.
    pub fn new(base_url: impl Into<String>, http: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http,
            max_line_bytes: None,
        }
    }

    /// Limit the length of a single streamed line.
    pub fn with_max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// A fresh session configured like this client.
    pub fn new_session(&self, cancel: CancelHandle) -> StreamSession {
        StreamSession::with_cancel(cancel).with_max_line_bytes(self.max_line_bytes)
    }

    pub(crate) fn max_line_bytes(&self) -> Option<usize> {
        self.max_line_bytes
    }

    /// List installed models.
    pub async fn list_models(&self) -> ChatResult<Vec<ModelInfo>> {
        let list: ModelList<ModelInfo> = self.get_json("models").await?;
        debug!(count = list.models.len(), "Listed models");
        Ok(list.models)
    }

    /// List models currently loaded in memory.
    pub async fn list_running(&self) -> ChatResult<Vec<RunningModel>> {
        let list: ModelList<RunningModel> = self.get_json("running").await?;
        Ok(list.models)
    }

    /// Stream a chat response into `session`.
    ///
    /// The request is always sent with `stream: true`. Transport problems end
    /// the session in `Failed`; an `Err` means the request could not even be
    /// serialized.
    pub async fn stream_chat<O>(
        &self,
        request: &ChatRequest,
        session: &mut StreamSession,
        observer: &mut O,
    ) -> ChatResult<SessionState>
    where
        O: SessionObserver + ?Sized,
    {
        let mut request = request.clone();
        request.stream = true;
        let body = serde_json::to_string(&request)?;
        debug!(model = %request.model, messages = request.messages.len(), "Streaming chat");
        Ok(session
            .start(&self.http, &self.url("chat"), &body, observer)
            .await)
    }

    /// Send a chat request with `stream: false` and return the whole body.
    pub async fn chat_once(&self, request: &ChatRequest) -> ChatResult<Value> {
        let mut request = request.clone();
        request.stream = false;
        self.post_json("chat", &request).await
    }

    /// Stream a prompt completion into `session`.
    pub async fn stream_generate<O>(
        &self,
        request: &GenerateRequest,
        session: &mut StreamSession,
        observer: &mut O,
    ) -> ChatResult<SessionState>
    where
        O: SessionObserver + ?Sized,
    {
        let mut request = request.clone();
        request.stream = true;
        let body = serde_json::to_string(&request)?;
        debug!(model = %request.model, "Streaming generate");
        Ok(session
            .start(&self.http, &self.url("generate"), &body, observer)
            .await)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ChatResult<T> {
        let response = self
            .http
            .get(&self.url(path), &json_headers())
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ChatResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)?;
        let response = self
            .http
            .post(&self.url(path), &body, &json_headers())
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

pub(crate) fn json_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}
