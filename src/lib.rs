//! ollama-chat - a streaming chat client for a local Ollama web backend
//!
//! The core is the NDJSON chat stream: [`ndjson`] frames and parses the
//! response body, [`session`] drives one stream to a terminal state and
//! [`orchestrator`] ties a stream to a stored conversation.
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod ndjson;
pub mod orchestrator;
pub mod session;
pub mod traits;

pub use error::{ChatError, ChatResult, StreamError};
