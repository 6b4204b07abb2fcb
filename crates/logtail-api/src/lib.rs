//! Log query API client for logtail
//!
//! This crate provides the remote side of log tailing: resource kind naming,
//! query construction, and the HTTP fetcher for the log query endpoint.

mod client;
mod error;
mod query;
mod resources;

pub use client::{ClientConfig, Credentials, LogApiClient, LogSource};
pub use error::FetchError;
pub use query::{LogPage, LogQuery, LogType, parse_response, DEFAULT_INTERVAL_SECS, DEFAULT_PAGE_SIZE};
pub use resources::{ResourceKind, ResourceRegistry, UnknownKind, pluralize};

// Re-export types used in our public API
pub use logtail_types::{LogEntry, LogFilters, ResourceRef, Severity, TimeWindow};
