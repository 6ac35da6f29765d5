//! Error category classification.
//!
//! Categories give callers one place to decide whether to retry, tell the
//! user to fix something, or just report the failure.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS, timeout or mid-stream read failures.
    /// Generally transient and retryable.
    Network,

    /// The backend answered with an error status (5xx and friends).
    Server,

    /// The backend sent data that does not follow the NDJSON chat protocol,
    /// or reported an in-band error.
    Protocol,

    /// Caller misuse (blank message, concurrent send on one conversation).
    Client,

    /// The caller aborted the request.
    Cancelled,

    /// Configuration file or environment problems.
    Configuration,

    /// The conversation store rejected or failed an operation.
    Storage,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Client => "client",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Storage => "storage",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check that the chat backend is running and reachable",
            ErrorCategory::Server => "The backend or the model server reported a failure. Try again later",
            ErrorCategory::Protocol => "The backend may be a different version than this client",
            ErrorCategory::Client => "Please check your input and try again",
            ErrorCategory::Cancelled => "The request was stopped before it finished",
            ErrorCategory::Configuration => "Check your configuration file and OLLAMA_CHAT_* variables",
            ErrorCategory::Storage => "The conversation could not be saved. Your message is still shown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
