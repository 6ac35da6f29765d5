//! NDJSON stream decoding
//!
//! The chat backend streams newline-delimited JSON: one object per line.
//!
//! # Module structure
//! - `decoder` - byte chunks to complete lines (FrameDecoder)
//! - `events` - ProtocolEvent definitions
//! - `payloads` - internal wire shapes
//! - `parser` - chat lines to ProtocolEvents
//! - `pull` - model pull progress lines to PullEvents

mod decoder;
mod events;
mod parser;
mod payloads;
mod pull;

pub use decoder::{FrameDecoder, Lines};
pub use events::ProtocolEvent;
pub use parser::{parse_line, parse_value};
pub use pull::{parse_pull_line, PullEvent};
