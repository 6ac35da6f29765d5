//! Streaming-related error types.
//!
//! These are the failures a chat stream can run into between the first byte
//! of the response and its completion marker. Only some of them end the
//! stream: see [`StreamError::is_terminal`].

use std::fmt;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A single line grew past the configured decoder limit.
    ///
    /// Never produced by an unbounded decoder.
    Framing { length: usize, limit: usize },

    /// A line was not valid JSON (or not a chat chunk object).
    Parse { raw: String },

    /// A well-formed line carried an `error` field from upstream.
    Protocol { message: String },

    /// The connection failed, returned a non-success status, or ended
    /// before the completion marker.
    Transport { message: String },

    /// The caller aborted the stream.
    Cancelled,
}

impl StreamError {
    /// Whether this error ends the stream session.
    ///
    /// Parse and protocol errors are reported inline and the stream keeps
    /// going.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamError::Parse { .. } | StreamError::Protocol { .. })
    }

    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::Transport { .. })
    }

    /// Get a user-friendly error message.
    ///
    /// This is the text annotations carry. Upstream errors are shown as the
    /// model server worded them.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Framing { length, limit } => format!(
                "The server sent a line of {} bytes, over the {} byte limit",
                length, limit
            ),
            StreamError::Parse { raw } => format!("Malformed line: {}", raw),
            StreamError::Protocol { message } => message.clone(),
            StreamError::Transport { message } => format!("Connection problem: {}", message),
            StreamError::Cancelled => "Stopped".to_string(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Framing { .. } => "E_STREAM_FRAMING",
            StreamError::Parse { .. } => "E_STREAM_PARSE",
            StreamError::Protocol { .. } => "E_STREAM_PROTOCOL",
            StreamError::Transport { .. } => "E_STREAM_TRANSPORT",
            StreamError::Cancelled => "E_STREAM_CANCEL",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Framing { length, limit } => {
                write!(f, "Line of {} bytes exceeds limit of {} bytes", length, limit)
            }
            StreamError::Parse { raw } => write!(f, "Malformed line {:?}", raw),
            StreamError::Protocol { message } => write!(f, "Upstream error: {}", message),
            StreamError::Transport { message } => write!(f, "Transport error: {}", message),
            StreamError::Cancelled => write!(f, "Stream cancelled"),
        }
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_protocol_are_recoverable() {
        let parse = StreamError::Parse {
            raw: "not json".to_string(),
        };
        let protocol = StreamError::Protocol {
            message: "model not found".to_string(),
        };
        assert!(!parse.is_terminal());
        assert!(!protocol.is_terminal());
    }

    #[test]
    fn test_transport_framing_and_cancel_are_terminal() {
        assert!(StreamError::Transport {
            message: "reset".to_string()
        }
        .is_terminal());
        assert!(StreamError::Framing {
            length: 10,
            limit: 4
        }
        .is_terminal());
        assert!(StreamError::Cancelled.is_terminal());
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(StreamError::Transport {
            message: "reset".to_string()
        }
        .is_retryable());
        assert!(!StreamError::Cancelled.is_retryable());
        assert!(!StreamError::Protocol {
            message: "x".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(StreamError::Cancelled.error_code(), "E_STREAM_CANCEL");
        assert_eq!(
            StreamError::Framing { length: 1, limit: 0 }.error_code(),
            "E_STREAM_FRAMING"
        );
    }

    #[test]
    fn test_display_format() {
        let err = StreamError::Protocol {
            message: "model not found".to_string(),
        };
        assert_eq!(format!("{}", err), "Upstream error: model not found");
        assert_eq!(err.user_message(), "model not found");
    }

    #[test]
    fn test_user_messages_keep_details() {
        let parse = StreamError::Parse {
            raw: "{oops".to_string(),
        };
        assert_eq!(parse.user_message(), "Malformed line: {oops");
        let framing = StreamError::Framing {
            length: 70000,
            limit: 65536,
        };
        assert!(framing.user_message().contains("70000"));
        assert!(StreamError::Transport {
            message: "reset".to_string()
        }
        .user_message()
        .ends_with("reset"));
    }
}
