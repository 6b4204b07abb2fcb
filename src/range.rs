//! Time range flags: `--start`, `--end` and `--period`

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Parse a time flag. Values without an offset are UTC; a bare date means noon UTC.
pub fn parse_time_flag(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t.and_utc());
        }
    }
    // Noon keeps the range clear of midnight boundary issues in the backend
    if let Some(t) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(12, 0, 0))
    {
        return Ok(t.and_utc());
    }
    bail!(
        "invalid time format '{}'. Use RFC3339 format (e.g., 2006-01-02T15:04:05Z) or YYYY-MM-DD",
        s
    )
}

/// Parse a period such as `3d`, `1h`, `10m` or `30s`
pub fn parse_period(s: &str) -> Result<Duration> {
    let pattern = Regex::new(r"^(\d+)([dhms])$")?;
    let caps = pattern
        .captures(s.trim())
        .with_context(|| format!("invalid period '{}'. Use a number followed by d, h, m or s", s))?;
    let n: i64 = caps[1]
        .parse()
        .with_context(|| format!("period '{}' is too large", s))?;
    let duration = match &caps[2] {
        "d" => Duration::try_days(n),
        "h" => Duration::try_hours(n),
        "m" => Duration::try_minutes(n),
        _ => Duration::try_seconds(n),
    };
    duration.with_context(|| format!("period '{}' is too large", s))
}

/// Raw time flags as given on the command line
#[derive(Debug, Default, Clone)]
pub struct RangeFlags {
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Resolve flags into `(start, end)`
///
/// Explicit start and end win over a period. With neither, single-shot reads
/// the last hour and follow mode starts 15 minutes back.
pub fn resolve_range(
    flags: &RangeFlags,
    follow: bool,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = flags
        .start
        .as_deref()
        .map(parse_time_flag)
        .transpose()
        .context("invalid start time")?;
    let end = flags
        .end
        .as_deref()
        .map(parse_time_flag)
        .transpose()
        .context("invalid end time")?;

    if let (Some(start), Some(end)) = (start, end) {
        return Ok((start, end));
    }
    if let Some(period) = &flags.period {
        return Ok((now - parse_period(period)?, now));
    }

    let end = end.unwrap_or(now);
    if let Some(start) = start {
        return Ok((start, end));
    }
    let lookback = if follow {
        Duration::minutes(15)
    } else {
        Duration::hours(1)
    };
    Ok((end - lookback, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_time_flag_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_time_flag("2024-01-01T08:30:00Z").unwrap(), expected);
        assert_eq!(parse_time_flag("2024-01-01T10:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_time_flag("2024-01-01T08:30:00").unwrap(), expected);
        assert_eq!(parse_time_flag("2024-01-01 08:30:00").unwrap(), expected);
        assert_eq!(
            parse_time_flag("2024-01-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        assert!(parse_time_flag("yesterday").is_err());
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("3d").unwrap(), Duration::days(3));
        assert_eq!(parse_period("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_period("10m").unwrap(), Duration::minutes(10));
        assert_eq!(parse_period("45s").unwrap(), Duration::seconds(45));
        assert!(parse_period("1w").is_err());
        assert!(parse_period("h").is_err());
        assert!(parse_period("-1h").is_err());
        assert!(parse_period("99999999999999999999d").is_err());
    }

    #[test]
    fn test_default_ranges() {
        let flags = RangeFlags::default();
        assert_eq!(
            resolve_range(&flags, false, now()).unwrap(),
            (now() - Duration::hours(1), now())
        );
        assert_eq!(
            resolve_range(&flags, true, now()).unwrap(),
            (now() - Duration::minutes(15), now())
        );
    }

    #[test]
    fn test_explicit_range_wins_over_period() {
        let flags = RangeFlags {
            period: Some("3d".into()),
            start: Some("2024-01-01".into()),
            end: Some("2024-01-02".into()),
        };
        let (start, end) = resolve_range(&flags, false, now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_period_and_start_only() {
        let flags = RangeFlags {
            period: Some("2h".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_range(&flags, false, now()).unwrap(),
            (now() - Duration::hours(2), now())
        );

        let flags = RangeFlags {
            start: Some("2024-01-15T09:00:00Z".into()),
            ..Default::default()
        };
        let (start, end) = resolve_range(&flags, false, now()).unwrap();
        assert_eq!(start, now() - Duration::hours(1));
        assert_eq!(end, now());
    }

    #[test]
    fn test_bad_start_reports_flag() {
        let flags = RangeFlags {
            start: Some("soon".into()),
            ..Default::default()
        };
        let err = resolve_range(&flags, false, now()).unwrap_err();
        assert!(format!("{err:#}").starts_with("invalid start time"));
    }
}
