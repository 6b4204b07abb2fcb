//! Line framing for push-style build log streams
//!
//! The body is newline delimited. Lines may carry a `data: ` prefix, and a
//! `data: [DONE]` line ends the stream. Unprefixed lines pass through as-is so
//! plain line sources work too.

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use logtail_types::{LogEntry, SessionState};

use crate::error::SessionError;
use crate::event::WatchEvent;

pub const DONE_SENTINEL: &str = "[DONE]";
const DATA_PREFIX: &str = "data: ";

/// Type-erased body reader, as produced by [`BuildStream::from_response`]
pub type BoxedReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// Classification of one raw line
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Blank line
    Skip,
    /// Payload to deliver
    Line(&'a str),
    /// End-of-stream sentinel
    Done,
}

pub fn frame_line(raw: &str) -> Frame<'_> {
    let line = raw.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Frame::Skip;
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(data) if data.trim() == DONE_SENTINEL => Frame::Done,
        Some(data) => Frame::Line(data),
        None => Frame::Line(line),
    }
}

/// Yields payload lines until the sentinel or end of input
///
/// Lines are split on raw bytes; invalid UTF-8 is replaced rather than
/// ending the stream.
pub struct SseReader<R> {
    reader: R,
    buf: Vec<u8>,
    saw_sentinel: bool,
}

impl<R: AsyncBufRead + Unpin> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            saw_sentinel: false,
        }
    }

    /// Next payload line; `None` once the stream is finished.
    /// A trailing line without a newline is still delivered.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.saw_sentinel {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            let raw = String::from_utf8_lossy(&self.buf);
            let raw = raw.strip_suffix('\n').unwrap_or(&raw);
            match frame_line(raw) {
                Frame::Skip => continue,
                Frame::Line(line) => return Ok(Some(line.to_string())),
                Frame::Done => {
                    self.saw_sentinel = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Whether the stream ended with `[DONE]` rather than plain EOF
    pub fn saw_sentinel(&self) -> bool {
        self.saw_sentinel
    }
}

/// Read a whole stream into its payload lines
pub async fn collect_lines<R: AsyncBufRead + Unpin>(reader: R) -> io::Result<Vec<String>> {
    let mut reader = SseReader::new(reader);
    let mut lines = Vec::new();
    while let Some(line) = reader.next_line().await? {
        lines.push(line);
    }
    Ok(lines)
}

fn finish(state: &Mutex<SessionState>, to: SessionState) {
    let mut state = state.lock();
    if *state == SessionState::Running {
        *state = to;
    }
}

/// Session consuming a pushed build log body on a background task
///
/// Ends `Completed` on `[DONE]` or EOF, `Failed` on a read error and
/// `Stopped` on cancellation or when the receiver goes away.
pub struct BuildStream<R> {
    label: String,
    reader: Option<R>,
    events: Option<mpsc::UnboundedSender<WatchEvent>>,
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl BuildStream<BoxedReader> {
    /// Wrap a streaming HTTP response body
    pub fn from_response(
        label: impl Into<String>,
        response: reqwest::Response,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Self {
        let body = response.bytes_stream().map_err(io::Error::other);
        let reader: BoxedReader = Box::pin(StreamReader::new(Box::pin(body)));
        Self::new(label, reader, events)
    }
}

impl<R> BuildStream<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(
        label: impl Into<String>,
        reader: R,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Self {
        Self {
            label: label.into(),
            reader: Some(reader),
            events: Some(events),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        let (reader, events) = {
            let mut state = self.state.lock();
            if *state != SessionState::Idle {
                return Err(SessionError::InvalidTransition { from: *state });
            }
            let (Some(reader), Some(events)) = (self.reader.take(), self.events.take()) else {
                return Err(SessionError::InvalidTransition { from: *state });
            };
            *state = SessionState::Running;
            (reader, events)
        };

        let label = self.label.clone();
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        tracing::info!(stream = %label, "starting build log stream");

        self.task = Some(tokio::spawn(async move {
            let mut reader = SseReader::new(reader);
            loop {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        finish(&state, SessionState::Stopped);
                        break;
                    }
                    result = reader.next_line() => result,
                };

                match result {
                    Ok(Some(line)) => {
                        let received = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                        if events.send(WatchEvent::Log(LogEntry::new(received, line))).is_err() {
                            finish(&state, SessionState::Stopped);
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!(
                            stream = %label,
                            sentinel = reader.saw_sentinel(),
                            "build log stream finished"
                        );
                        finish(&state, SessionState::Completed);
                        let _ = events.send(WatchEvent::Completed);
                        break;
                    }
                    Err(e) => {
                        tracing::error!(stream = %label, error = %e, "build log stream failed");
                        finish(&state, SessionState::Failed);
                        let _ = events.send(WatchEvent::Fatal(format!(
                            "Error reading build logs: {}",
                            e
                        )));
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    /// Idempotent; safe before `start`
    pub fn stop(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Idle | SessionState::Running) {
            *state = SessionState::Stopped;
        }
    }

    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }
}

impl<R> Drop for BuildStream<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_frame_line() {
        assert_eq!(frame_line(""), Frame::Skip);
        assert_eq!(frame_line("  \r"), Frame::Skip);
        assert_eq!(frame_line("data: hello"), Frame::Line("hello"));
        assert_eq!(frame_line("plain line\r"), Frame::Line("plain line"));
        assert_eq!(frame_line("data: [DONE]"), Frame::Done);
        // Only the exact prefix is stripped
        assert_eq!(frame_line("data:x"), Frame::Line("data:x"));
    }

    #[tokio::test]
    async fn test_sentinel_ends_stream() {
        let body: &[u8] = b"data: line1\ndata: [DONE]\ndata: line2\n";
        assert_eq!(collect_lines(body).await.unwrap(), vec!["line1"]);
    }

    #[tokio::test]
    async fn test_blank_lines_skipped_without_prefix() {
        let body: &[u8] = b"line1\n\n\nline2\n";
        assert_eq!(collect_lines(body).await.unwrap(), vec!["line1", "line2"]);
    }

    #[tokio::test]
    async fn test_empty_and_unterminated_input() {
        let empty: &[u8] = b"";
        assert!(collect_lines(empty).await.unwrap().is_empty());

        let body: &[u8] = b"data: a\ndata: b";
        assert_eq!(collect_lines(body).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_kept_and_stream_continues() {
        let body: &[u8] = b"data: ok\ndata: caf\xe9\ndata: after\ndata: [DONE]\n";
        let mut reader = SseReader::new(body);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["ok", "caf\u{fffd}", "after"]);
        assert!(reader.saw_sentinel());
    }

    #[tokio::test]
    async fn test_reader_reports_sentinel() {
        let body: &[u8] = b"data: a\ndata: [DONE]\n";
        let mut reader = SseReader::new(body);
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("a"));
        assert!(!reader.saw_sentinel());
        assert_eq!(reader.next_line().await.unwrap(), None);
        assert!(reader.saw_sentinel());
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<WatchEvent>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_build_stream_completes_on_sentinel() {
        let body: &'static [u8] = b"data: step 1\n\ndata: step 2\ndata: [DONE]\ndata: late\n";
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = BuildStream::new("build", body, tx);
        stream.start().unwrap();

        let events = drain(rx).await;
        stream.wait().await;

        let messages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WatchEvent::Log(entry) => Some(entry.message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["step 1", "step 2"]);
        assert_eq!(events.last(), Some(&WatchEvent::Completed));
        assert_eq!(stream.state(), SessionState::Completed);
        assert!(stream.start().is_err());
    }

    #[tokio::test]
    async fn test_build_stream_completes_despite_invalid_utf8() {
        let body: &'static [u8] = b"data: caf\xe9\r\ndata: after\r\ndata: [DONE]\r\n";
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = BuildStream::new("build", body, tx);
        stream.start().unwrap();

        let events = drain(rx).await;
        stream.wait().await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], WatchEvent::Log(e) if e.message == "caf\u{fffd}"));
        assert!(matches!(&events[1], WatchEvent::Log(e) if e.message == "after"));
        assert_eq!(events[2], WatchEvent::Completed);
        assert_eq!(stream.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_build_stream_fails_on_read_error() {
        let chunks: Vec<io::Result<&'static [u8]>> = vec![
            Ok(&b"data: one\n"[..]),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let reader = StreamReader::new(futures::stream::iter(chunks));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = BuildStream::new("build", reader, tx);
        stream.start().unwrap();

        let events = drain(rx).await;
        stream.wait().await;

        assert!(matches!(&events[0], WatchEvent::Log(e) if e.message == "one"));
        assert!(matches!(&events[1], WatchEvent::Fatal(m) if m.contains("reset")));
        assert_eq!(stream.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_build_stream_stop() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut stream = BuildStream::new("build", tokio::io::BufReader::new(reader), tx);

        stream.start().unwrap();
        writer.write_all(b"data: first\n").await.unwrap();
        assert!(matches!(rx.recv().await, Some(WatchEvent::Log(_))));

        stream.stop();
        stream.stop();
        stream.wait().await;
        assert_eq!(stream.state(), SessionState::Stopped);
        assert_eq!(rx.recv().await, None);
    }
}
