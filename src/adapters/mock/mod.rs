//! Mock implementations for testing.
//!
//! Test doubles for the trait seams, so sessions, the API client and the
//! orchestrator can be exercised without a network or a running backend.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`InMemoryStore`] - In-memory conversation store

pub mod http;
pub mod store;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use store::InMemoryStore;
