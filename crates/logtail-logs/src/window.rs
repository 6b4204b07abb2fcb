use chrono::{DateTime, Duration, Utc};

use logtail_types::TimeWindow;

#[derive(Clone, Debug)]
enum Mode {
    /// Same window on every tick
    Bounded { window: TimeWindow },
    /// Start trails the last successful fetch by `overlap`
    Sliding {
        initial_start: DateTime<Utc>,
        overlap: Duration,
        forward: Duration,
    },
}

/// Computes the query window for each tick
#[derive(Clone, Debug)]
pub struct WindowPlanner {
    mode: Mode,
    last_fetch: Option<DateTime<Utc>>,
}

impl WindowPlanner {
    /// Fixed `[session_start, session_start + span)`
    pub fn bounded(session_start: DateTime<Utc>, span: Duration) -> Self {
        Self {
            mode: Mode::Bounded {
                window: TimeWindow::starting_at(session_start, span),
            },
            last_fetch: None,
        }
    }

    /// Advancing window; `forward` only exists because the API needs an end bound
    pub fn sliding(initial_start: DateTime<Utc>, overlap: Duration, forward: Duration) -> Self {
        Self {
            mode: Mode::Sliding {
                initial_start,
                overlap: overlap.max(Duration::zero()),
                forward,
            },
            last_fetch: None,
        }
    }

    pub fn next_window(&self, now: DateTime<Utc>) -> TimeWindow {
        match &self.mode {
            Mode::Bounded { window } => *window,
            Mode::Sliding {
                initial_start,
                overlap,
                forward,
            } => {
                let start = match self.last_fetch {
                    Some(t) => t - *overlap,
                    None => *initial_start,
                };
                TimeWindow::starting_at(start, (now + *forward) - start)
            }
        }
    }

    /// Advance the cursor; only called after a successful fetch
    pub fn record_success(&mut self, fetched_at: DateTime<Utc>) {
        self.last_fetch = Some(fetched_at);
    }

    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_bounded_window_is_fixed() {
        let mut planner = WindowPlanner::bounded(t0(), Duration::minutes(15));
        let first = planner.next_window(t0());
        planner.record_success(t0() + Duration::seconds(2));
        let later = planner.next_window(t0() + Duration::minutes(30));

        assert_eq!(first, later);
        assert_eq!(first.start(), t0());
        assert_eq!(first.end(), t0() + Duration::minutes(15));
    }

    #[test]
    fn test_sliding_first_window_uses_caller_start() {
        let start = t0() - Duration::minutes(15);
        let planner = WindowPlanner::sliding(start, Duration::seconds(30), Duration::hours(24));
        let window = planner.next_window(t0());
        assert_eq!(window.start(), start);
        assert_eq!(window.end(), t0() + Duration::hours(24));
    }

    #[test]
    fn test_sliding_window_trails_previous_fetch() {
        let mut planner =
            WindowPlanner::sliding(t0(), Duration::seconds(30), Duration::hours(24));
        planner.record_success(t0());
        let now = t0() + Duration::seconds(15);
        let window = planner.next_window(now);
        assert_eq!(window.start(), t0() - Duration::seconds(30));
        assert_eq!(window.end(), now + Duration::hours(24));
    }

    #[test]
    fn test_failed_tick_does_not_advance_cursor() {
        let mut planner =
            WindowPlanner::sliding(t0(), Duration::seconds(30), Duration::hours(24));
        planner.record_success(t0());
        // Two failed ticks: no record_success calls
        let w1 = planner.next_window(t0() + Duration::seconds(15));
        let w2 = planner.next_window(t0() + Duration::seconds(30));
        assert_eq!(w1.start(), w2.start());
        assert_eq!(planner.last_fetch_time(), Some(t0()));
    }

    #[test]
    fn test_sliding_windows_never_leave_a_gap() {
        let overlap = Duration::seconds(30);
        let mut planner = WindowPlanner::sliding(t0(), overlap, Duration::hours(24));
        let mut previous: Option<TimeWindow> = None;

        for tick in 0..20 {
            let now = t0() + Duration::seconds(15 * tick);
            let window = planner.next_window(now);
            assert!(window.end() >= window.start());
            if let Some(prev) = previous {
                assert!(window.start() <= prev.end() - overlap);
            }
            // Every third tick fails
            if tick % 3 != 2 {
                planner.record_success(now);
            }
            previous = Some(window);
        }
    }

    #[test]
    fn test_future_start_still_yields_valid_window() {
        let start = t0() + Duration::days(3);
        let planner = WindowPlanner::sliding(start, Duration::seconds(30), Duration::hours(24));
        let window = planner.next_window(t0());
        assert_eq!(window.start(), start);
        assert_eq!(window.end(), start);
    }
}
