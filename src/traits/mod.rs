//! Trait abstractions for dependency injection and testability.
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, DELETE, streaming POST)
//! - [`ConversationStore`] - conversation persistence

pub mod http;
pub mod store;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use store::ConversationStore;
