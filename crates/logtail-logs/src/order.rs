use std::cmp::Ordering;

use logtail_types::LogEntry;

/// Put a backend batch (newest first, possibly shuffled) into oldest-first order
///
/// The batch is reversed before a stable sort so entries sharing a timestamp
/// keep their reversed backend order. Entries whose timestamp does not parse
/// sort before parsed ones, by raw string.
pub fn chronological(mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.reverse();
    entries.sort_by(compare_timestamps);
    entries
}

fn compare_timestamps(a: &LogEntry, b: &LogEntry) -> Ordering {
    match (a.parsed_timestamp(), b.parsed_timestamp()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.timestamp.cmp(&b.timestamp),
    }
}

/// True when timestamps never decrease
pub fn is_chronological(entries: &[LogEntry]) -> bool {
    entries
        .windows(2)
        .all(|pair| compare_timestamps(&pair[0], &pair[1]) != Ordering::Greater)
}
