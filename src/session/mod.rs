//! Stream sessions: one in-flight chat response.
//!
//! A [`StreamSession`] wires the NDJSON frame decoder and event parser to an
//! [`AssistantMessage`] accumulator, reports every change to a
//! [`SessionObserver`] and stops on completion, cancellation or failure.
//!
//! ```text
//! Idle ──start──▶ Streaming ──done──────▶ Completed
//!                     │ ──cancel────▶ Aborted
//!                     │ ──transport─▶ Failed
//! ```

mod cancel;
mod message;
mod observer;
mod state;
mod stream;

pub use cancel::CancelHandle;
pub use message::{Annotation, AnnotationKind, AssistantMessage, StreamUpdate};
pub use observer::{NoopObserver, SessionObserver};
pub use state::SessionState;
pub use stream::StreamSession;

pub(crate) use stream::ndjson_headers;
