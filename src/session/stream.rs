//! The stream session state machine.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use super::{AssistantMessage, CancelHandle, SessionObserver, SessionState, StreamUpdate};
use crate::error::StreamError;
use crate::ndjson::{parse_line, FrameDecoder, ProtocolEvent};
use crate::traits::{Headers, HttpClient, HttpError};

/// Headers for a request whose response is an NDJSON stream.
pub(crate) fn ndjson_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/x-ndjson".to_string());
    headers
}

/// One in-flight streamed response.
///
/// The session can be driven two ways. [`start`](Self::start) issues the
/// request and reads the body to the end; [`begin`](Self::begin),
/// [`feed`](Self::feed) and [`finish`](Self::finish) let a caller push chunks
/// it already has. Either way every update goes to the observer in the order
/// the bytes arrived, followed by exactly one [`StreamUpdate::Finished`].
#[derive(Debug)]
pub struct StreamSession {
    decoder: FrameDecoder,
    progress: Progress,
    cancel: CancelHandle,
}

/// State that line handling mutates, kept apart from the decoder so both can
/// be borrowed while lines are being yielded.
#[derive(Debug, Default)]
struct Progress {
    state: SessionState,
    message: AssistantMessage,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::with_cancel(CancelHandle::new())
    }

    /// Create a session that stops when `cancel` is aborted.
    pub fn with_cancel(cancel: CancelHandle) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            progress: Progress::default(),
            cancel,
        }
    }

    /// Reject lines longer than `limit` bytes. `None` keeps lines unbounded.
    pub fn with_max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.decoder = match limit {
            Some(limit) => FrameDecoder::with_max_line_bytes(limit),
            None => FrameDecoder::new(),
        };
        self
    }

    pub fn state(&self) -> SessionState {
        self.progress.state
    }

    pub fn message(&self) -> &AssistantMessage {
        &self.progress.message
    }

    pub fn into_message(self) -> AssistantMessage {
        self.progress.message
    }

    /// A handle that aborts this session from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Abort the session in place.
    ///
    /// Returns `true` if this call moved the session to `Aborted`. Does not
    /// notify any observer; the caller already knows.
    pub fn cancel(&mut self) -> bool {
        self.cancel.abort();
        if self.progress.state.is_terminal() {
            return false;
        }
        debug!(from = %self.progress.state, "Stream session cancelled");
        self.progress.state = SessionState::Aborted;
        true
    }

    /// Issue the streaming request and consume the response.
    ///
    /// Never fails: connection errors and error statuses end the session in
    /// `Failed` with a transport annotation. Returns the terminal state.
    pub async fn start<C, O>(
        &mut self,
        client: &C,
        url: &str,
        body: &str,
        observer: &mut O,
    ) -> SessionState
    where
        C: HttpClient + ?Sized,
        O: SessionObserver + ?Sized,
    {
        if self.progress.state != SessionState::Idle {
            return self.progress.state;
        }
        if self.begin_with(observer).is_terminal() {
            return self.progress.state;
        }

        debug!(url, "Starting stream request");
        let headers = ndjson_headers();
        let cancel = self.cancel.clone();
        let response = tokio::select! {
            biased;
            _ = cancel.aborted() => {
                self.progress.terminate(SessionState::Aborted, observer);
                return self.progress.state;
            }
            response = client.post_stream(url, body, &headers) => response,
        };

        match response {
            Ok(stream) => self.consume(stream, observer).await,
            Err(HttpError::Cancelled) => {
                self.progress.terminate(SessionState::Aborted, observer);
                self.progress.state
            }
            Err(e) => {
                self.progress.fail(
                    StreamError::Transport {
                        message: e.to_string(),
                    },
                    observer,
                );
                self.progress.state
            }
        }
    }

    /// Read a response body to its end, cancellation or failure.
    ///
    /// The body is dropped before returning, whatever the outcome, which
    /// closes the underlying connection if it is still open.
    pub async fn consume<S, O>(&mut self, mut body: S, observer: &mut O) -> SessionState
    where
        S: Stream<Item = Result<Bytes, HttpError>> + Unpin,
        O: SessionObserver + ?Sized,
    {
        if self.progress.state == SessionState::Idle {
            self.begin_with(observer);
        }
        let cancel = self.cancel.clone();
        while self.progress.state == SessionState::Streaming {
            tokio::select! {
                biased;
                _ = cancel.aborted() => {
                    self.progress.terminate(SessionState::Aborted, observer);
                }
                chunk = body.next() => match chunk {
                    Some(Ok(chunk)) => {
                        self.feed(&chunk, observer);
                    }
                    Some(Err(e)) => {
                        self.progress.fail(
                            StreamError::Transport {
                                message: e.to_string(),
                            },
                            observer,
                        );
                    }
                    None => {
                        self.finish(observer);
                    }
                },
            }
        }
        drop(body);
        debug!(state = %self.progress.state, "Released response body");
        self.progress.state
    }

    /// Move from `Idle` to `Streaming` without an observer.
    ///
    /// A session whose handle was already aborted goes straight to
    /// `Aborted`.
    pub fn begin(&mut self) -> SessionState {
        self.begin_with(&mut super::NoopObserver)
    }

    fn begin_with<O: SessionObserver + ?Sized>(&mut self, observer: &mut O) -> SessionState {
        if self.progress.state != SessionState::Idle {
            return self.progress.state;
        }
        if self.cancel.is_aborted() {
            debug!("Stream session aborted before start");
            self.progress.terminate(SessionState::Aborted, observer);
        } else {
            self.progress.state = SessionState::Streaming;
        }
        self.progress.state
    }

    /// Push one chunk of the response body.
    ///
    /// Lines completed by the chunk are handled in order. Handling stops at
    /// the first terminal event; later lines are never looked at. The abort
    /// signal is checked before every line, so an observer that aborts
    /// stops the rest of the chunk too.
    pub fn feed<O>(&mut self, chunk: &[u8], observer: &mut O) -> SessionState
    where
        O: SessionObserver + ?Sized,
    {
        if self.progress.state != SessionState::Streaming {
            return self.progress.state;
        }
        for line in self.decoder.feed(chunk) {
            if self.cancel.is_aborted() {
                self.progress.terminate(SessionState::Aborted, observer);
                break;
            }
            self.progress.handle_line(line, observer);
            if self.progress.state.is_terminal() {
                break;
            }
        }
        self.progress.state
    }

    /// Signal the end of the response body.
    ///
    /// Flushes any unterminated last line. A body that ends without a
    /// completion marker fails the session.
    pub fn finish<O>(&mut self, observer: &mut O) -> SessionState
    where
        O: SessionObserver + ?Sized,
    {
        while self.progress.state == SessionState::Streaming {
            if self.cancel.is_aborted() {
                self.progress.terminate(SessionState::Aborted, observer);
                break;
            }
            match self.decoder.finish() {
                Some(line) => self.progress.handle_line(line, observer),
                None => {
                    self.progress.fail(
                        StreamError::Transport {
                            message: "stream ended before completion".to_string(),
                        },
                        observer,
                    );
                }
            }
        }
        self.progress.state
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    fn handle_line<O>(&mut self, line: Result<String, StreamError>, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.is_terminal() => {
                self.fail(e, observer);
                return;
            }
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "Recoverable stream error");
                if let Some(update) = self.message.report(&e) {
                    observer.on_update(&update, &self.message);
                }
                return;
            }
        };
        for event in parse_line(&line) {
            match &event {
                ProtocolEvent::Done => {
                    self.terminate(SessionState::Completed, observer);
                    return;
                }
                ProtocolEvent::MalformedLine { raw } => {
                    warn!(line = %raw, "Skipping malformed stream line");
                }
                ProtocolEvent::UpstreamError { message } => {
                    warn!(error = %message, "Upstream reported an error mid-stream");
                }
                _ => {}
            }
            if let Some(update) = self.message.apply(&event) {
                observer.on_update(&update, &self.message);
            }
        }
    }

    fn fail<O>(&mut self, error: StreamError, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        if self.state.is_terminal() {
            return;
        }
        warn!(code = error.error_code(), error = %error, "Stream session failed");
        if let Some(update) = self.message.report(&error) {
            observer.on_update(&update, &self.message);
        }
        self.terminate(SessionState::Failed, observer);
    }

    fn terminate<O>(&mut self, state: SessionState, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        if self.state.is_terminal() {
            return;
        }
        debug!(from = %self.state, to = %state, "Stream session finished");
        self.state = state;
        observer.on_update(&StreamUpdate::Finished(state), &self.message);
    }
}
