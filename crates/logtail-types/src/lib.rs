//! Shared types for logtail
//!
//! This crate contains data structures used across multiple logtail crates.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Resource Types
// ============================================================================

/// Identity of the resource whose logs are queried
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    pub workspace: String,
    /// Resource kind in singular form (e.g. "agent", "sandbox")
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(
        workspace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Name of the first empty identity field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.workspace.trim().is_empty() {
            Some("workspace")
        } else if self.kind.trim().is_empty() {
            Some("resource kind")
        } else if self.name.trim().is_empty() {
            Some("resource name")
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.workspace, self.kind, self.name)
    }
}

/// Optional server-side filters applied to every query of a session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilters {
    /// Severities to include (empty = all)
    pub severities: Vec<Severity>,
    pub search: Option<String>,
    pub task_id: Option<String>,
    pub execution_id: Option<String>,
    pub trace_id: Option<String>,
}

impl LogFilters {
    pub fn with_severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = severities;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    /// Value of the `severity` query parameter
    pub fn severity_param(&self) -> String {
        if self.severities.is_empty() {
            return SEVERITY_WILDCARD.to_string();
        }
        self.severities
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Wildcard form of the severity parameter, matching every level
pub const SEVERITY_WILDCARD: &str = "all,UNKNOWN,TRACE,DEBUG,INFO,WARNING,ERROR,FATAL";

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Fatal,
    Unknown,
}

impl Severity {
    /// Parse a severity name as accepted by the API
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "FATAL" => Some(Self::Fatal),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Parse a comma-separated severity list, e.g. `ERROR,FATAL`
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut out = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let severity = Self::parse(part).ok_or_else(|| {
                format!(
                    "invalid severity '{}'. Valid: FATAL, ERROR, WARNING, INFO, DEBUG, TRACE, UNKNOWN",
                    part
                )
            })?;
            if !out.contains(&severity) {
                out.push(severity);
            }
        }
        Ok(out)
    }

    /// Map a numeric severity code (OpenTelemetry severity number ranges)
    pub fn from_code(code: i64) -> Self {
        match code {
            1..=4 => Self::Trace,
            5..=8 => Self::Debug,
            9..=12 => Self::Info,
            13..=16 => Self::Warning,
            17..=20 => Self::Error,
            21..=24 => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Deserialize a field that may be absent or `null` as its default value
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single log line as returned by the log query API
///
/// Null or missing fields decode to their zero values so one odd record
/// does not fail a whole page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Backend-supplied timestamp (second precision, UTC)
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,

    /// Numeric severity code
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: i64,

    #[serde(default, rename = "trace_id", deserialize_with = "null_as_default")]
    pub trace_id: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            severity: 0,
            trace_id: String::new(),
        }
    }

    /// Composite identity used for deduplication
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.timestamp, self.message)
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_log_timestamp(&self.timestamp)
    }

    pub fn level(&self) -> Severity {
        Severity::from_code(self.severity)
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// Timestamp format of the `start`/`end` query parameters (UTC, no suffix)
pub const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a time for the log query API
pub fn format_api_time(t: DateTime<Utc>) -> String {
    t.format(API_TIME_FORMAT).to_string()
}

/// Parse a backend log timestamp; values without an offset are taken as UTC
pub fn parse_log_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeWindowError {
    #[error("start time must be before end time")]
    EndBeforeStart,

    #[error("time range exceeds maximum of {max_days} days (requested: {requested_hours}h)")]
    TooLong { max_days: i64, requested_hours: i64 },
}

/// A `[start, end)` query window; `end >= start` holds by construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeWindowError> {
        if end < start {
            return Err(TimeWindowError::EndBeforeStart);
        }
        Ok(Self { start, end })
    }

    /// Window starting at `start` and spanning `span` (negative spans clamp to empty)
    pub fn starting_at(start: DateTime<Utc>, span: Duration) -> Self {
        Self {
            start,
            end: start + span.max(Duration::zero()),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Reject windows longer than `max`
    pub fn ensure_within(&self, max: Duration) -> Result<(), TimeWindowError> {
        if self.duration() > max {
            return Err(TimeWindowError::TooLong {
                max_days: max.num_days(),
                requested_hours: self.duration().num_hours(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle of a watch session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Stopped,
    Failed,
    /// Push-based build stream saw its end sentinel
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_severity_param_wildcard_when_empty() {
        assert_eq!(LogFilters::default().severity_param(), SEVERITY_WILDCARD);
    }

    #[test]
    fn test_severity_param_joined() {
        let filters =
            LogFilters::default().with_severities(vec![Severity::Error, Severity::Fatal]);
        assert_eq!(filters.severity_param(), "ERROR,FATAL");
    }

    #[test]
    fn test_parse_severity_list() {
        let list = Severity::parse_list("error, fatal,ERROR").unwrap();
        assert_eq!(list, vec![Severity::Error, Severity::Fatal]);
        assert!(Severity::parse_list("loud").is_err());
        assert!(Severity::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_severity_from_code() {
        assert_eq!(Severity::from_code(0), Severity::Unknown);
        assert_eq!(Severity::from_code(9), Severity::Info);
        assert_eq!(Severity::from_code(17), Severity::Error);
        assert_eq!(Severity::from_code(24), Severity::Fatal);
    }

    #[test]
    fn test_entry_deserialize_and_key() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"timestamp":"2024-01-15T10:30:00Z","message":"hello","severity":9,"trace_id":"abc"}"#,
        )
        .unwrap();
        assert_eq!(entry.trace_id, "abc");
        assert_eq!(entry.level(), Severity::Info);
        assert_eq!(entry.dedup_key(), "2024-01-15T10:30:00Z:hello");
    }

    #[test]
    fn test_entry_null_fields_decode_to_defaults() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"timestamp":"2024-01-15T10:30:00Z","message":"hello","severity":null,"trace_id":null}"#,
        )
        .unwrap();
        assert_eq!(entry.severity, 0);
        assert_eq!(entry.trace_id, "");

        let entry: LogEntry = serde_json::from_str(r#"{"timestamp":null,"message":"bare"}"#).unwrap();
        assert_eq!(entry.timestamp, "");
        assert_eq!(entry.message, "bare");
        assert_eq!(entry.level(), Severity::Unknown);
    }

    #[test]
    fn test_parse_log_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_log_timestamp("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_log_timestamp("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_log_timestamp("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_log_timestamp("not a time"), None);
    }

    #[test]
    fn test_format_api_time_has_no_suffix() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 5).unwrap();
        assert_eq!(format_api_time(t), "2024-01-15T10:30:05");
    }

    #[test]
    fn test_time_window_rejects_inverted() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            TimeWindow::new(t, t - Duration::seconds(1)),
            Err(TimeWindowError::EndBeforeStart)
        );
        assert!(TimeWindow::new(t, t).is_ok());
    }

    #[test]
    fn test_time_window_max_range() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let window = TimeWindow::new(t, t + Duration::days(4)).unwrap();
        assert!(window.ensure_within(Duration::days(3)).is_err());
        let window = TimeWindow::new(t, t + Duration::days(3)).unwrap();
        assert!(window.ensure_within(Duration::days(3)).is_ok());
    }

    #[test]
    fn test_resource_ref_missing_field() {
        assert_eq!(ResourceRef::new("ws", "agent", "a").missing_field(), None);
        assert_eq!(
            ResourceRef::new("ws", "agent", " ").missing_field(),
            Some("resource name")
        );
    }
}
