/// What the session should do after a failed fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureVerdict {
    /// First failure of a run: tell the consumer once, keep going
    Warn,
    /// Keep retrying without telling the consumer again
    Retry,
    /// Threshold reached; the session ends as failed
    Abort,
}

/// Counts consecutive fetch failures
#[derive(Clone, Debug)]
pub struct FailureMonitor {
    consecutive: u32,
    max_failures: u32,
}

impl FailureMonitor {
    pub fn new(max_failures: u32) -> Self {
        Self {
            consecutive: 0,
            max_failures: max_failures.max(1),
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn record_failure(&mut self) -> FailureVerdict {
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive >= self.max_failures {
            FailureVerdict::Abort
        } else if self.consecutive == 1 {
            FailureVerdict::Warn
        } else {
            FailureVerdict::Retry
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }
}
