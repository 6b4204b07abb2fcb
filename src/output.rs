use chrono::Local;

use logtail_types::LogEntry;

/// How log lines are printed
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputFormat {
    pub timestamps: bool,
    pub utc: bool,
}

impl OutputFormat {
    /// `[YYYY-MM-DD HH:MM:SS.mmm] message`, or just the message
    pub fn format(&self, entry: &LogEntry) -> String {
        if !self.timestamps {
            return entry.message.clone();
        }
        let Some(ts) = entry.parsed_timestamp() else {
            return format!("[{}] {}", entry.timestamp, entry.message);
        };
        let shown = if self.utc {
            ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
        };
        format!("[{}] {}", shown, entry.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_utc() {
        let format = OutputFormat {
            timestamps: true,
            utc: true,
        };
        let entry = LogEntry::new("2024-01-15T10:00:01.25Z", "ready");
        assert_eq!(format.format(&entry), "[2024-01-15 10:00:01.250] ready");
    }

    #[test]
    fn test_format_without_timestamps() {
        let format = OutputFormat::default();
        let entry = LogEntry::new("2024-01-15T10:00:01Z", "ready");
        assert_eq!(format.format(&entry), "ready");
    }

    #[test]
    fn test_unparsed_timestamp_printed_raw() {
        let format = OutputFormat {
            timestamps: true,
            utc: false,
        };
        let entry = LogEntry::new("garbage", "ready");
        assert_eq!(format.format(&entry), "[garbage] ready");
    }
}
