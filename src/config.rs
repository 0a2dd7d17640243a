//! Runtime settings for a wait

use std::time::Duration;

use crate::error::{Result, WaitError};

/// Polling cadence used when inotify is unavailable
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Sleep between evaluations in polling mode
    pub poll_interval: Duration,

    /// Give up after this long; `None` waits forever
    pub timeout: Option<Duration>,

    /// Skip inotify and poll from the start
    pub force_poll: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            force_poll: false,
        }
    }
}

impl WaitConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn polling(mut self) -> Self {
        self.force_poll = true;
        self
    }

    /// Build from raw command-line values
    pub fn from_args(timeout_secs: Option<f64>, interval_ms: u64, force_poll: bool) -> Result<Self> {
        if interval_ms == 0 {
            return Err(WaitError::Usage("poll interval must be at least 1ms".to_string()));
        }

        let timeout = timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| WaitError::Usage(format!("invalid timeout: {}", secs)))
            })
            .transpose()?;

        Ok(Self {
            poll_interval: Duration::from_millis(interval_ms),
            timeout,
            force_poll,
        })
    }
}
