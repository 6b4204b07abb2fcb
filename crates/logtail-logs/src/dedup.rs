use std::collections::HashSet;

use parking_lot::Mutex;

use logtail_types::LogEntry;

/// Set of `(timestamp, message)` keys already delivered in one session
///
/// The set only grows. Check-and-insert happens under one lock so the session
/// task can admit entries while other threads read the count.
#[derive(Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entry; true only the first time its key is seen
    pub fn admit(&self, entry: &LogEntry) -> bool {
        self.seen.lock().insert(entry.dedup_key())
    }

    /// Keep only entries not delivered before, preserving order
    pub fn retain_new(&self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let mut seen = self.seen.lock();
        entries
            .into_iter()
            .filter(|e| seen.insert(e.dedup_key()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
