//! Unified error type for the chat client.

use thiserror::Error;

use super::category::ErrorCategory;
use super::stream::StreamError;
use crate::config::ConfigError;
use crate::traits::HttpError;

/// Errors returned by the client, the conversation store and the orchestrator.
///
/// Stream-level problems that happen *during* a chat session never show up
/// here; the session absorbs them into its terminal state and annotations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure talking to the backend.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// A streaming failure that escaped a session (pull feeds, framing).
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// A response body was not the JSON we expected.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The conversation store failed.
    #[error("Conversation store error: {0}")]
    Store(String),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The user message was empty or whitespace.
    #[error("Message is empty")]
    EmptyMessage,

    /// No model was given and no default is configured.
    #[error("No model selected. Pass --model or set a default model")]
    MissingModel,

    /// Another session is already streaming into this conversation.
    #[error("Conversation {0} already has a response in progress")]
    SessionActive(String),
}

impl ChatError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::Http(err) => match err {
                HttpError::ServerError { .. } => ErrorCategory::Server,
                HttpError::Cancelled => ErrorCategory::Cancelled,
                HttpError::InvalidUrl(_) => ErrorCategory::Configuration,
                _ => ErrorCategory::Network,
            },
            ChatError::Stream(err) => match err {
                StreamError::Transport { .. } => ErrorCategory::Network,
                StreamError::Cancelled => ErrorCategory::Cancelled,
                _ => ErrorCategory::Protocol,
            },
            ChatError::Json(_) => ErrorCategory::Protocol,
            ChatError::Store(_) => ErrorCategory::Storage,
            ChatError::Config(_) => ErrorCategory::Configuration,
            ChatError::EmptyMessage | ChatError::MissingModel | ChatError::SessionActive(_) => {
                ErrorCategory::Client
            }
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Http(HttpError::ServerError { status, .. }) => {
                *status >= 500 || *status == 429 || *status == 408
            }
            _ => self.category().is_retryable(),
        }
    }
}

/// Type alias for Results using [`ChatError`].
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_errors_are_categorized() {
        let conn: ChatError = HttpError::ConnectionFailed("refused".to_string()).into();
        assert_eq!(conn.category(), ErrorCategory::Network);
        assert!(conn.is_retryable());

        let status: ChatError = HttpError::ServerError {
            status: 404,
            message: "not found".to_string(),
        }
        .into();
        assert_eq!(status.category(), ErrorCategory::Server);
        assert!(!status.is_retryable());

        let busy: ChatError = HttpError::ServerError {
            status: 503,
            message: "busy".to_string(),
        }
        .into();
        assert!(busy.is_retryable());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ChatError = json_err.into();
        assert!(matches!(err, ChatError::Json(_)));
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(ChatError::EmptyMessage.category(), ErrorCategory::Client);
        assert_eq!(ChatError::MissingModel.category(), ErrorCategory::Client);
        let active = ChatError::SessionActive("abc".to_string());
        assert_eq!(active.category(), ErrorCategory::Client);
        assert!(active.to_string().contains("abc"));
    }

    #[test]
    fn test_stream_error_categories() {
        let framing: ChatError = StreamError::Framing { length: 9, limit: 8 }.into();
        assert_eq!(framing.category(), ErrorCategory::Protocol);
        let cancelled: ChatError = StreamError::Cancelled.into();
        assert_eq!(cancelled.category(), ErrorCategory::Cancelled);
    }
}
