use std::time::Duration as TickDuration;

use chrono::Duration;

use logtail_api::{DEFAULT_INTERVAL_SECS, DEFAULT_PAGE_SIZE, LogType};

/// Tuning for watch sessions and single-shot fetches
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Tick interval of the bounded watcher
    pub bounded_tick: TickDuration,
    /// Tick interval of the sliding follower
    pub sliding_tick: TickDuration,
    /// Span of the bounded watcher's fixed window
    pub bounded_span: Duration,
    /// How far each sliding window reaches back before the previous fetch.
    /// Must exceed the backend's ingestion lag.
    pub overlap: Duration,
    /// End bound of sliding windows, relative to now
    pub sliding_forward: Duration,
    /// Consecutive failures that end a session
    pub max_failures: u32,
    pub page_size: usize,
    /// Upper bound on pages requested per tick or single-shot fetch
    pub max_pages: usize,
    pub interval_secs: u64,
    pub log_type: LogType,
    /// Longest range a single-shot fetch accepts
    pub max_query_range: Duration,
    /// Treat "resource key absent from response" as an empty page instead of
    /// a failure. Off by default: a missing key counts toward `max_failures`.
    pub missing_resource_is_empty: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bounded_tick: TickDuration::from_secs(2),
            sliding_tick: TickDuration::from_secs(15),
            bounded_span: Duration::minutes(15),
            overlap: Duration::seconds(30),
            sliding_forward: Duration::hours(24),
            max_failures: 5,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: 10,
            interval_secs: DEFAULT_INTERVAL_SECS,
            log_type: LogType::All,
            max_query_range: Duration::days(3),
            missing_resource_is_empty: false,
        }
    }
}

impl EngineConfig {
    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    pub fn with_missing_resource_as_empty(mut self, enabled: bool) -> Self {
        self.missing_resource_is_empty = enabled;
        self
    }

    /// First setting that would make a session misbehave, if any
    pub(crate) fn invalid_setting(&self) -> Option<&'static str> {
        if self.bounded_tick.is_zero() || self.sliding_tick.is_zero() {
            Some("tick interval must be non-zero")
        } else if self.max_failures == 0 {
            Some("max_failures must be at least 1")
        } else if self.page_size == 0 {
            Some("page_size must be at least 1")
        } else if self.overlap < Duration::zero() {
            Some("overlap must not be negative")
        } else {
            None
        }
    }
}
