//! Fixed-cadence fallback driver

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps between evaluations when no notification channel is available
#[derive(Debug, Clone, Copy)]
pub struct PollSession {
    interval: Duration,
}

impl PollSession {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep one interval, cut short by `deadline`. Returns false if the
    /// deadline had already passed.
    pub fn sleep(&self, deadline: Option<Instant>) -> bool {
        let nap = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                remaining.min(self.interval)
            }
            None => self.interval,
        };
        // std retries on EINTR internally
        thread::sleep(nap);
        true
    }
}
