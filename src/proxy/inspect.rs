//! Best-effort inspection of streamed SSE responses (log-only).
//!
//! [`InspectedBody`] wraps the upstream response body and forwards every
//! frame unchanged while feeding data frames to an [`SseScanner`], which
//! scans for `data:` lines and logs incremental content fields it can
//! parse. Parse failures are swallowed; the relayed bytes are never
//! touched. Enabled at compile time by the `stream-inspect` feature and
//! at runtime by `--trace-stream`.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};

/// A line longer than this without a newline means the body is not a
/// line-delimited text stream; the scanner gives up on the buffer.
const MAX_LINE_BYTES: usize = 64 * 1024;

pub struct InspectedBody<B> {
    inner: B,
    scanner: SseScanner,
}

impl<B> InspectedBody<B> {
    pub fn new(inner: B, correlation_id: String) -> Self {
        Self {
            inner,
            scanner: SseScanner::new(correlation_id),
        }
    }
}

impl<B> Body for InspectedBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.scanner.feed(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Reassembles lines across chunk boundaries and logs parsed `data:`
/// payloads. Holds no reference to the relayed frames.
pub struct SseScanner {
    correlation_id: String,
    buf: Vec<u8>,
}

impl SseScanner {
    #[must_use]
    pub fn new(correlation_id: String) -> Self {
        Self {
            correlation_id,
            buf: Vec::new(),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.scan_line(line.trim_end_matches(['\n', '\r']));
        }

        if self.buf.len() > MAX_LINE_BYTES {
            tracing::trace!(
                correlation_id = %self.correlation_id,
                "stream is not line-delimited, dropping inspection buffer"
            );
            self.buf.clear();
        }
    }

    fn scan_line(&self, line: &str) {
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim_start();

        if payload == "[DONE]" {
            tracing::debug!(correlation_id = %self.correlation_id, "stream finished");
            return;
        }

        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(event) => {
                // OpenAI-style chat chunks, then Anthropic-style deltas
                let content = event
                    .pointer("/choices/0/delta/content")
                    .and_then(serde_json::Value::as_str)
                    .or_else(|| event.pointer("/delta/text").and_then(serde_json::Value::as_str));

                if let Some(text) = content {
                    tracing::debug!(
                        correlation_id = %self.correlation_id,
                        content = %text,
                        "stream delta"
                    );
                }
            }
            Err(e) => {
                tracing::trace!(
                    correlation_id = %self.correlation_id,
                    error = %e,
                    "unparseable stream line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_lines_across_chunks() {
        let mut scanner = SseScanner::new("test".into());
        scanner.feed(b"data: {\"delta\":{\"te");
        assert_eq!(scanner.buf, b"data: {\"delta\":{\"te");
        scanner.feed(b"xt\":\"hi\"}}\n");
        assert!(scanner.buf.is_empty());
    }

    #[test]
    fn garbage_lines_are_swallowed() {
        let mut scanner = SseScanner::new("test".into());
        scanner.feed(b"data: not json at all\n");
        scanner.feed(b": comment line\n");
        scanner.feed(b"\n");
        assert!(scanner.buf.is_empty());
    }

    #[test]
    fn oversized_buffer_is_dropped() {
        let mut scanner = SseScanner::new("test".into());
        scanner.feed(&vec![b'x'; MAX_LINE_BYTES + 1]);
        assert!(scanner.buf.is_empty());
    }

    #[test]
    fn invalid_utf8_does_not_panic() {
        let mut scanner = SseScanner::new("test".into());
        scanner.feed(&[b'd', 0xff, 0xfe, b'\n']);
        assert!(scanner.buf.is_empty());
    }
}
