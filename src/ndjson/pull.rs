//! Model pull progress feed.
//!
//! `POST /pull` streams NDJSON like the chat endpoint, but its lines describe
//! download progress instead of assistant output:
//!
//! ```text
//! {"status":"pulling manifest"}
//! {"status":"pulling 6a0746a1ec1a","digest":"sha256:6a07…","total":4661211424,"completed":241970}
//! {"status":"success"}
//! ```

use serde::{Deserialize, Serialize};

use crate::ndjson::payloads::{error_text, PullPayload};

/// One progress event from a model pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PullEvent {
    /// A phase change without byte counts ("pulling manifest", "verifying sha256 digest").
    Status { status: String },
    /// Download progress for one layer.
    Progress {
        status: String,
        digest: Option<String>,
        total: u64,
        completed: u64,
    },
    /// The pull finished.
    Success,
    /// The server reported a failure.
    Error { message: String },
    /// The line could not be decoded.
    Malformed { raw: String },
}

impl PullEvent {
    /// Completed fraction in `0.0..=1.0` for progress events.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            PullEvent::Progress {
                total, completed, ..
            } if *total > 0 => Some((*completed as f64 / *total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Parse one pull progress line. Blank lines and lines with no recognised
/// field yield `None`.
pub fn parse_pull_line(line: &str) -> Option<PullEvent> {
    if line.trim().is_empty() {
        return None;
    }

    let payload: PullPayload = match serde_json::from_str(line) {
        Ok(payload) => payload,
        Err(_) => {
            return Some(PullEvent::Malformed {
                raw: line.to_string(),
            })
        }
    };

    if let Some(error) = payload.error.as_ref() {
        return Some(PullEvent::Error {
            message: error_text(error),
        });
    }

    let status = payload.status?;
    if status == "success" {
        return Some(PullEvent::Success);
    }

    match payload.total {
        Some(total) => Some(PullEvent::Progress {
            status,
            digest: payload.digest,
            total,
            completed: payload.completed.unwrap_or(0),
        }),
        None => Some(PullEvent::Status { status }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(
            parse_pull_line(r#"{"status":"pulling manifest"}"#),
            Some(PullEvent::Status {
                status: "pulling manifest".to_string()
            })
        );
    }

    #[test]
    fn test_progress_line() {
        let event = parse_pull_line(
            r#"{"status":"pulling 6a07","digest":"sha256:6a07","total":200,"completed":50}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PullEvent::Progress {
                status: "pulling 6a07".to_string(),
                digest: Some("sha256:6a07".to_string()),
                total: 200,
                completed: 50,
            }
        );
        assert_eq!(event.fraction(), Some(0.25));
    }

    #[test]
    fn test_progress_without_completed_starts_at_zero() {
        let event = parse_pull_line(r#"{"status":"pulling x","total":10}"#).unwrap();
        assert_eq!(event.fraction(), Some(0.0));
    }

    #[test]
    fn test_success_line() {
        assert_eq!(
            parse_pull_line(r#"{"status":"success"}"#),
            Some(PullEvent::Success)
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            parse_pull_line(r#"{"error":"pull model manifest: file does not exist"}"#),
            Some(PullEvent::Error {
                message: "pull model manifest: file does not exist".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_and_blank_lines() {
        assert_eq!(
            parse_pull_line("oops"),
            Some(PullEvent::Malformed {
                raw: "oops".to_string()
            })
        );
        assert_eq!(parse_pull_line(""), None);
        assert_eq!(parse_pull_line("{}"), None);
    }
}
