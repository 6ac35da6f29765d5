use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a stream session.
///
/// `Completed`, `Aborted` and `Failed` are terminal: no transition leaves
/// them and no update is emitted after reaching one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Aborted | SessionState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
