/// SSE stream reframer.
///
/// Intermediate proxies and the network layer split one logical SSE event
/// across arbitrary physical chunks, which breaks streaming JSON parsers on
/// the browser side that assume chunk-aligned events. This module re-chunks
/// an upstream byte stream so that every chunk handed downstream ends exactly
/// on an event boundary (`\n\n` or `\r\n\r\n`), without changing a single
/// byte of the relayed content.
///
/// The reframer operates on raw bytes. The blank-line delimiter is ASCII and
/// can never occur inside a multi-byte UTF-8 sequence, so Korean text split
/// across chunk boundaries passes through intact with no re-encoding.
use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use memchr::memmem;
use std::sync::LazyLock;

/// Default cap on bytes buffered while waiting for an event delimiter.
pub const DEFAULT_MAX_EVENT_BYTES: usize = 1024 * 1024;

/// Terminal failure of a reframed stream.
///
/// Either condition aborts the downstream body; a partial, silently
/// truncated stream is worse than an explicit error signal.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    #[error("upstream read failed: {0}")]
    Upstream(String),
    #[error("buffered {buffered} bytes without an event delimiter (cap {cap})")]
    EventTooLarge { buffered: usize, cap: usize },
}

/// Find the end offset of the earliest event delimiter at or after
/// `scan_from`. A `\n\n` and a `\r\n\r\n` can never start at the same
/// offset, so the earlier end is unambiguous.
#[inline]
fn find_event_terminator(buffer: &[u8], scan_from: usize) -> Option<usize> {
    static LF_LF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\n\n"));
    static CRLF_CRLF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\r\n\r\n"));

    let scan_from = scan_from.min(buffer.len());
    let haystack = &buffer[scan_from..];
    let lf_lf_end = LF_LF_FINDER.find(haystack).map(|at| scan_from + at + 2);
    let crlf_crlf_end = CRLF_CRLF_FINDER.find(haystack).map(|at| scan_from + at + 4);

    match (lf_lf_end, crlf_crlf_end) {
        (Some(lf), Some(crlf)) => Some(lf.min(crlf)),
        (lf, crlf) => lf.or(crlf),
    }
}

#[inline]
fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Per-connection accumulation state.
///
/// Created when a proxied response begins streaming, fed every upstream
/// chunk, flushed at end of stream, and dropped with the response. Never
/// shared across connections.
struct Reframer {
    buffer: BytesMut,
    scan_from: usize,
    max_buffered: usize,
}

impl Reframer {
    fn new(max_buffered: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            scan_from: 0,
            max_buffered,
        }
    }

    /// Append a chunk and return the longest event-aligned prefix, if any.
    ///
    /// Delimiter-only frames are never emitted as their own write: they stay
    /// buffered and ride along as the prefix of the next emitted frame or
    /// the final flush, keeping the relay byte-lossless without ever
    /// producing a blank intermediate write.
    fn push(&mut self, chunk: &[u8]) -> Result<Option<Bytes>, ReframeError> {
        if !chunk.is_empty() {
            self.buffer.extend_from_slice(chunk);
        }

        let mut aligned_end = None;
        let mut pos = self.scan_from;
        while let Some(end) = find_event_terminator(&self.buffer, pos) {
            pos = end;
            aligned_end = Some(end);
        }

        match aligned_end {
            Some(end) if !is_blank(&self.buffer[..end]) => {
                let frame = self.buffer.split_to(end).freeze();
                self.scan_from = 0;
                return Ok(Some(frame));
            }
            Some(end) => {
                self.scan_from = end;
            }
            None => {
                // Keep a small overlap so a terminator split across chunk
                // boundaries is still found on the next scan.
                self.scan_from = self
                    .scan_from
                    .max(self.buffer.len().saturating_sub(3));
            }
        }

        // The cap applies to everything still buffered, including a run of
        // blank frames that will only ever leave via the final flush.
        if self.buffer.len() > self.max_buffered {
            return Err(ReframeError::EventTooLarge {
                buffered: self.buffer.len(),
                cap: self.max_buffered,
            });
        }
        Ok(None)
    }

    /// Emit whatever remains, verbatim. Only called at end of stream.
    fn flush(&mut self) -> Option<Bytes> {
        self.scan_from = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

/// Wrap an upstream byte stream into an event-aligned byte stream.
///
/// Concatenating every yielded chunk reproduces the upstream bytes exactly;
/// only write granularity changes. Every yielded chunk except possibly the
/// final flush ends on an SSE event boundary, and no blank intermediate
/// chunk is ever yielded. Upstream read errors and buffer-cap overflow
/// surface as [`ReframeError`] items, terminating the stream.
pub fn reframe_sse_stream<S, E>(
    upstream: S,
    max_buffered: usize,
) -> impl Stream<Item = Result<Bytes, ReframeError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (Box::pin(upstream), Reframer::new(max_buffered), false),
        |(mut stream, mut reframer, done)| async move {
            if done {
                return None;
            }
            loop {
                match stream.as_mut().next().await {
                    Some(Ok(chunk)) => match reframer.push(&chunk) {
                        Ok(Some(frame)) => {
                            return Some((Ok(frame), (stream, reframer, false)));
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!("aborting reframed stream: {err}");
                            return Some((Err(err), (stream, reframer, true)));
                        }
                    },
                    Some(Err(err)) => {
                        tracing::warn!("upstream stream read failed: {err}");
                        let err = ReframeError::Upstream(err.to_string());
                        return Some((Err(err), (stream, reframer, true)));
                    }
                    None => {
                        let tail = reframer.flush();
                        return tail.map(|frame| (Ok(frame), (stream, reframer, true)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::convert::Infallible;

    async fn reframe_chunks(chunks: Vec<&'static [u8]>) -> Vec<Result<Bytes, ReframeError>> {
        let source = futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<Bytes, Infallible>(Bytes::from_static(chunk))),
        );
        reframe_sse_stream(source, DEFAULT_MAX_EVENT_BYTES)
            .collect()
            .await
    }

    async fn reframe_ok(chunks: Vec<&'static [u8]>) -> Vec<Bytes> {
        reframe_chunks(chunks)
            .await
            .into_iter()
            .map(|item| item.expect("no stream error expected"))
            .collect()
    }

    fn concat(frames: &[Bytes]) -> Vec<u8> {
        frames.iter().flat_map(|frame| frame.iter().copied()).collect()
    }

    #[tokio::test]
    async fn test_single_complete_event_passes_through() {
        let frames = reframe_ok(vec![b"data: hello\n\n"]).await;
        assert_eq!(frames, vec![Bytes::from_static(b"data: hello\n\n")]);
    }

    #[tokio::test]
    async fn test_event_split_across_chunks_is_reassembled() {
        let frames = reframe_ok(vec![b"data: hel", b"lo\n", b"\n"]).await;
        assert_eq!(frames, vec![Bytes::from_static(b"data: hello\n\n")]);
    }

    #[tokio::test]
    async fn test_multiple_events_in_one_chunk_stay_aligned() {
        let frames = reframe_ok(vec![b"data: a\n\ndata: b\n\ndata: tail"]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Bytes::from_static(b"data: a\n\ndata: b\n\n"));
        assert_eq!(frames[1], Bytes::from_static(b"data: tail"));
    }

    #[tokio::test]
    async fn test_lossless_under_arbitrary_splits() {
        let original: &[u8] =
            "data: {\"text\":\"강남구 평균 시세\"}\n\ndata: {\"done\":true}\n\n".as_bytes();
        // Split at every byte position, including mid-codepoint and
        // mid-delimiter, and verify byte-exact reassembly.
        for split_at in 1..original.len() {
            let (left, right) = original.split_at(split_at);
            let source = futures_util::stream::iter(vec![
                Ok::<Bytes, Infallible>(Bytes::copy_from_slice(left)),
                Ok::<Bytes, Infallible>(Bytes::copy_from_slice(right)),
            ]);
            let frames: Vec<Bytes> = reframe_sse_stream(source, DEFAULT_MAX_EVENT_BYTES)
                .map(|item| item.expect("no error"))
                .collect()
                .await;
            assert_eq!(concat(&frames), original, "split at {split_at}");
            for frame in &frames[..frames.len().saturating_sub(1)] {
                assert!(
                    frame.ends_with(b"\n\n"),
                    "non-final frame not event-aligned at split {split_at}: {frame:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_delimiter_only_chunk_never_emits_blank_write() {
        let frames = reframe_ok(vec![b"data: a\n\n", b"\n\n"]).await;
        // The stray delimiter surfaces only in the final flush, never as a
        // blank intermediate write.
        assert_eq!(frames[0], Bytes::from_static(b"data: a\n\n"));
        for frame in &frames[..frames.len() - 1] {
            assert!(!is_blank(frame), "blank intermediate write: {frame:?}");
        }
        assert_eq!(concat(&frames), b"data: a\n\n\n\n");
    }

    #[tokio::test]
    async fn test_leading_blank_frame_rides_with_next_event() {
        let frames = reframe_ok(vec![b"\n\n", b"data: b\n\n"]).await;
        assert_eq!(frames, vec![Bytes::from_static(b"\n\ndata: b\n\n")]);
    }

    #[tokio::test]
    async fn test_empty_chunk_does_not_stall() {
        let frames = reframe_ok(vec![b"", b"data: a\n\n", b""]).await;
        assert_eq!(frames, vec![Bytes::from_static(b"data: a\n\n")]);
    }

    #[tokio::test]
    async fn test_partial_tail_flushed_verbatim() {
        let frames = reframe_ok(vec![b"data: a\n\n", b"data: unfinished"]).await;
        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"data: a\n\n"),
                Bytes::from_static(b"data: unfinished"),
            ]
        );
    }

    #[tokio::test]
    async fn test_crlf_delimited_events() {
        let frames = reframe_ok(vec![b"data: a\r\n\r\ndata: b\r\n", b"\r\n"]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Bytes::from_static(b"data: a\r\n\r\n"));
        assert_eq!(frames[1], Bytes::from_static(b"data: b\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_korean_payload_split_mid_codepoint() {
        let original = "data: 집피티가 강남구 시세를 조회했습니다\n\n".as_bytes();
        // Split inside the first multi-byte codepoint of the payload.
        let (left, right) = original.split_at(8);
        let source = futures_util::stream::iter(vec![
            Ok::<Bytes, Infallible>(Bytes::copy_from_slice(left)),
            Ok::<Bytes, Infallible>(Bytes::copy_from_slice(right)),
        ]);
        let frames: Vec<Bytes> = reframe_sse_stream(source, DEFAULT_MAX_EVENT_BYTES)
            .map(|item| item.expect("no error"))
            .collect()
            .await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), original);
        assert!(std::str::from_utf8(&frames[0]).is_ok());
    }

    #[tokio::test]
    async fn test_upstream_error_propagates_and_terminates() {
        let source = futures_util::stream::iter(vec![
            Ok::<Bytes, &str>(Bytes::from_static(b"data: a\n\n")),
            Err("connection reset"),
        ]);
        let items: Vec<_> = reframe_sse_stream(source, DEFAULT_MAX_EVENT_BYTES)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].as_ref().expect("first frame"),
            &Bytes::from_static(b"data: a\n\n")
        );
        match items[1].as_ref().expect_err("read error expected") {
            ReframeError::Upstream(message) => assert!(message.contains("connection reset")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_buffer_cap_aborts_stream() {
        let source = futures_util::stream::iter(vec![
            Ok::<Bytes, Infallible>(Bytes::from(vec![b'x'; 64])),
            Ok::<Bytes, Infallible>(Bytes::from(vec![b'y'; 64])),
        ]);
        let items: Vec<_> = reframe_sse_stream(source, 100).collect().await;
        assert_eq!(items.len(), 1);
        match items[0].as_ref().expect_err("cap overflow expected") {
            ReframeError::EventTooLarge { buffered, cap } => {
                assert!(*buffered > 100);
                assert_eq!(*cap, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_only_input_respects_buffer_cap() {
        // Blank frames never emit on their own, so a stream of nothing but
        // delimiters accumulates until the cap aborts it.
        let source = futures_util::stream::iter(
            std::iter::repeat(Ok::<Bytes, Infallible>(Bytes::from_static(b"\n\n"))).take(200),
        );
        let items: Vec<_> = reframe_sse_stream(source, 100).collect().await;
        assert_eq!(items.len(), 1);
        match items[0].as_ref().expect_err("cap overflow expected") {
            ReframeError::EventTooLarge { buffered, cap } => {
                assert!(*buffered > 100);
                assert_eq!(*cap, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trailing_delimiter_at_chunk_end_yields_no_extra_write() {
        // A chunk ending exactly on a delimiter leaves an empty tail, which
        // must not surface as a write of its own.
        let frames = reframe_ok(vec![b"data: a\n\n"]).await;
        assert_eq!(frames.len(), 1);
    }
}
