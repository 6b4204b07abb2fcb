//! Log tailing engine for logtail
//!
//! This crate turns a paginated, lagging log query API into a duplicate-free
//! stream: polling watch sessions (bounded and sliding), single-shot fetches,
//! and the push-style build log stream.

mod config;
mod dedup;
mod error;
mod event;
mod failure;
mod fetcher;
mod order;
mod session;
mod sse;
#[cfg(test)]
mod testing;
mod window;

pub use config::EngineConfig;
pub use dedup::Deduplicator;
pub use error::SessionError;
pub use event::WatchEvent;
pub use failure::{FailureMonitor, FailureVerdict};
pub use fetcher::LogFetcher;
pub use order::{chronological, is_chronological};
pub use session::{WatchMode, WatchSession};
pub use sse::{BoxedReader, BuildStream, DONE_SENTINEL, Frame, SseReader, collect_lines, frame_line};
pub use window::WindowPlanner;

// Re-export types used in our public API
pub use logtail_api::{FetchError, LogSource};
pub use logtail_types::{LogEntry, LogFilters, ResourceRef, SessionState, TimeWindow};
