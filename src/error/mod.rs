//! Error handling for the chat client.
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Stream Errors**: the taxonomy of things that go wrong mid-stream
//! - **Unified Error Type**: `ChatError` for everything outside a session
//!
//! | Stream error | Raised when | Ends the session |
//! |--------------|-------------|------------------|
//! | Framing | a line exceeds the configured decoder limit | Yes |
//! | Parse | a line is not valid JSON | No |
//! | Protocol | a line carries an upstream `error` | No |
//! | Transport | connection drop, bad status, early EOF | Yes |
//! | Cancelled | the caller aborted | Yes (silently) |

mod category;
mod chat_error;
mod stream;

pub use category::ErrorCategory;
pub use chat_error::{ChatError, ChatResult};
pub use stream::StreamError;
