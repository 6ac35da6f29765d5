//! Model pulls.

use futures_util::StreamExt;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{json_headers, ApiClient};
use crate::error::{ChatResult, StreamError};
use crate::ndjson::{parse_pull_line, FrameDecoder, PullEvent};
use crate::session::{ndjson_headers, CancelHandle};
use crate::traits::HttpClient;

/// How a model pull ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The server reported `success`.
    Success,
    /// The server reported an error.
    Failed(String),
    /// The caller aborted the pull. The server may keep downloading.
    Aborted,
    /// The feed ended without a final status.
    Incomplete,
}

impl<C: HttpClient> ApiClient<C> {
    /// Pull a model, reporting each progress line to `on_event`.
    ///
    /// Connection failures and broken feeds are returned as errors; a
    /// failure reported by the server is a [`PullOutcome::Failed`].
    pub async fn pull_model<F>(
        &self,
        name: &str,
        cancel: &CancelHandle,
        mut on_event: F,
    ) -> ChatResult<PullOutcome>
    where
        F: FnMut(&PullEvent),
    {
        if cancel.is_aborted() {
            return Ok(PullOutcome::Aborted);
        }
        let body = json!({ "model": name, "stream": true }).to_string();
        let url = self.url("pull");
        let headers = ndjson_headers();
        info!(model = name, "Pulling model");

        let mut feed = tokio::select! {
            biased;
            _ = cancel.aborted() => return Ok(PullOutcome::Aborted),
            feed = self.http().post_stream(&url, &body, &headers) => feed?,
        };

        let mut decoder = match self.max_line_bytes() {
            Some(limit) => FrameDecoder::with_max_line_bytes(limit),
            None => FrameDecoder::new(),
        };

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.aborted() => return Ok(PullOutcome::Aborted),
                chunk = feed.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    for line in decoder.feed(&bytes) {
                        if cancel.is_aborted() {
                            return Ok(PullOutcome::Aborted);
                        }
                        if let Some(outcome) = handle_pull_line(line?, &mut on_event) {
                            return Ok(outcome);
                        }
                    }
                }
                Some(Err(e)) => {
                    return Err(StreamError::Transport {
                        message: e.to_string(),
                    }
                    .into())
                }
                None => break,
            }
        }

        while let Some(line) = decoder.finish() {
            if cancel.is_aborted() {
                return Ok(PullOutcome::Aborted);
            }
            if let Some(outcome) = handle_pull_line(line?, &mut on_event) {
                return Ok(outcome);
            }
        }
        debug!(model = name, "Pull feed ended without a final status");
        Ok(PullOutcome::Incomplete)
    }

    /// Pull a model with `stream: false`, waiting for the final status.
    pub async fn pull_model_blocking(&self, name: &str) -> ChatResult<PullOutcome> {
        let body = json!({ "model": name, "stream": false }).to_string();
        info!(model = name, "Pulling model (blocking)");
        let response = self
            .http()
            .post(&self.url("pull"), &body, &json_headers())
            .await?
            .error_for_status()?;
        Ok(match parse_pull_line(&response.text()) {
            Some(PullEvent::Success) => PullOutcome::Success,
            Some(PullEvent::Error { message }) => PullOutcome::Failed(message),
            _ => PullOutcome::Incomplete,
        })
    }
}

fn handle_pull_line<F>(line: String, on_event: &mut F) -> Option<PullOutcome>
where
    F: FnMut(&PullEvent),
{
    let event = parse_pull_line(&line)?;
    on_event(&event);
    match event {
        PullEvent::Success => Some(PullOutcome::Success),
        PullEvent::Error { message } => {
            warn!(error = %message, "Model pull failed");
            Some(PullOutcome::Failed(message))
        }
        PullEvent::Malformed { raw } => {
            warn!(line = %raw, "Skipping malformed pull line");
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::error::ChatError;
    use crate::traits::HttpError;
    use bytes::Bytes;

    const PULL_URL: &str = "http://localhost:8000/api/pull";

    fn client() -> (MockHttpClient, ApiClient<MockHttpClient>) {
        let http = MockHttpClient::new();
        (http.clone(), ApiClient::new("http://localhost:8000/api", http))
    }

    #[tokio::test]
    async fn test_pull_reports_progress_then_success() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::Stream(vec![
                Bytes::from("{\"status\":\"pulling manifest\"}\n{\"status\":\"pulling 6a07\",\"digest\":\"sha256:6a07\",\"total\":100,"),
                Bytes::from("\"completed\":50}\n{\"status\":\"success\"}\n"),
            ]),
        );
        let mut events = Vec::new();
        let outcome = api
            .pull_model("llama3", &CancelHandle::new(), |e| events.push(e.clone()))
            .await
            .unwrap();

        assert_eq!(outcome, PullOutcome::Success);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].fraction(), Some(0.5));
        let body = http.get_requests()[0].json_body().unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn test_pull_error_line() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::ndjson_lines(&[r#"{"error":"pull model manifest: file does not exist"}"#]),
        );
        let outcome = api
            .pull_model("nope", &CancelHandle::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PullOutcome::Failed("pull model manifest: file does not exist".to_string())
        );
    }

    #[tokio::test]
    async fn test_pull_without_final_status_is_incomplete() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::Stream(vec![Bytes::from("{\"status\":\"pulling manifest\"}")]),
        );
        let mut count = 0;
        let outcome = api
            .pull_model("llama3", &CancelHandle::new(), |_| count += 1)
            .await
            .unwrap();
        assert_eq!(outcome, PullOutcome::Incomplete);
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_pull_broken_feed_is_error() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::StreamThenError(vec![], HttpError::Io("reset".to_string())),
        );
        let result = api.pull_model("llama3", &CancelHandle::new(), |_| {}).await;
        assert!(matches!(
            result,
            Err(ChatError::Stream(StreamError::Transport { .. }))
        ));
    }

    #[tokio::test]
    async fn test_pull_aborted_while_waiting() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::StreamThenPending(vec![Bytes::from("{\"status\":\"pulling manifest\"}\n")]),
        );
        let cancel = CancelHandle::new();
        let aborter = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            aborter.abort();
        });
        let outcome = api.pull_model("llama3", &cancel, |_| {}).await.unwrap();
        assert_eq!(outcome, PullOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_abort_from_callback_skips_rest_of_chunk() {
        let (http, api) = client();
        http.set_response(
            PULL_URL,
            MockResponse::Stream(vec![Bytes::from(
                "{\"status\":\"pulling manifest\"}\n{\"status\":\"verifying sha256 digest\"}\n{\"status\":\"success\"}\n",
            )]),
        );
        let cancel = CancelHandle::new();
        let mut events = Vec::new();
        let outcome = api
            .pull_model("llama3", &cancel, |e| {
                events.push(e.clone());
                cancel.abort();
            })
            .await
            .unwrap();
        assert_eq!(outcome, PullOutcome::Aborted);
        assert_eq!(
            events,
            vec![PullEvent::Status {
                status: "pulling manifest".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_pull_blocking() {
        let (http, api) = client();
        http.set_response(PULL_URL, MockResponse::json(serde_json::json!({"status": "success"})));
        let outcome = api.pull_model_blocking("llama3").await.unwrap();
        assert_eq!(outcome, PullOutcome::Success);
        assert_eq!(http.get_requests()[0].json_body().unwrap()["stream"], false);
    }
}
