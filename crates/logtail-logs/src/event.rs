use logtail_types::LogEntry;

/// What a running session delivers to its consumer
///
/// Events are sent from the session's background task, never from the
/// caller's thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    /// A line not delivered before in this session
    Log(LogEntry),
    /// First fetch failure after a success (or after start)
    Warning(String),
    /// Failure threshold reached; nothing follows
    Fatal(String),
    /// Push stream finished normally; nothing follows
    Completed,
}
