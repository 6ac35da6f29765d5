//! Line framing for chunked NDJSON bodies.
//!
//! Chunks arrive at arbitrary byte boundaries: in the middle of a line, in the
//! middle of a multi-byte UTF-8 character, or exactly on a newline. The
//! decoder keeps raw bytes until a `\n` shows up and only then decodes the
//! line. `\n` never occurs inside a multi-byte UTF-8 sequence, so a split
//! character is always completed before its line is decoded.

use crate::error::StreamError;

/// Incremental splitter from raw chunks to complete lines.
///
/// Invariant: once the iterator returned by [`feed`](Self::feed) is
/// exhausted, the buffer holds no complete line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Start of the first line not yet yielded.
    start: usize,
    /// Bytes from `start` up to here are known to contain no newline.
    scanned: usize,
    max_line_bytes: Option<usize>,
    /// Set after an unterminated line went over the limit. Its remaining
    /// bytes are dropped up to and including the next newline.
    discarding: bool,
}

impl FrameDecoder {
    /// Create an unbounded decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that rejects lines longer than `limit` bytes.
    pub fn with_max_line_bytes(limit: usize) -> Self {
        Self {
            max_line_bytes: Some(limit),
            ..Self::default()
        }
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Append a chunk and iterate over the lines it completes.
    ///
    /// Lines are produced lazily. Any the caller does not consume stay
    /// buffered and come out of the next `feed` or `finish`.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.compact();
        self.buffer.extend_from_slice(chunk);
        Lines { decoder: self }
    }

    /// Flush the unterminated tail at end of stream.
    ///
    /// Returns `None` when the buffer is empty. Unread complete lines left by
    /// an abandoned [`Lines`] come out first, one per call.
    pub fn finish(&mut self) -> Option<Result<String, StreamError>> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }
        if self.pending_len() == 0 {
            self.discarding = false;
            return None;
        }
        let tail = self.buffer.split_off(self.start);
        self.buffer.clear();
        self.reset();
        let tail = strip_cr(&tail);
        if let Some(limit) = self.max_line_bytes {
            if tail.len() > limit {
                return Some(Err(StreamError::Framing {
                    length: tail.len(),
                    limit,
                }));
            }
        }
        Some(Ok(decode(tail)))
    }

    fn next_line(&mut self) -> Option<Result<String, StreamError>> {
        if self.discarding && !self.skip_rejected_tail() {
            return None;
        }
        let unscanned = &self.buffer[self.scanned..];
        match unscanned.iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let line = strip_cr(&self.buffer[self.start..end]);
                let result = match self.max_line_bytes {
                    Some(limit) if line.len() > limit => Err(StreamError::Framing {
                        length: line.len(),
                        limit,
                    }),
                    _ => Ok(decode(line)),
                };
                self.start = end + 1;
                self.scanned = self.start;
                Some(result)
            }
            None => {
                self.scanned = self.buffer.len();
                let pending = self.pending_len();
                match self.max_line_bytes {
                    Some(limit) if pending > limit => {
                        // The line can only get longer; drop what we have.
                        self.buffer.clear();
                        self.reset();
                        self.discarding = true;
                        Some(Err(StreamError::Framing {
                            length: pending,
                            limit,
                        }))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Drop the rest of a rejected line. Returns `false` while its newline
    /// has not arrived yet.
    fn skip_rejected_tail(&mut self) -> bool {
        match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                self.start = self.scanned + offset + 1;
                self.scanned = self.start;
                self.discarding = false;
                true
            }
            None => {
                self.buffer.clear();
                self.reset();
                false
            }
        }
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }

    fn reset(&mut self) {
        self.start = 0;
        self.scanned = 0;
    }
}

/// Lazy iterator over the lines completed by one [`FrameDecoder::feed`].
#[derive(Debug)]
pub struct Lines<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_line()
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}
