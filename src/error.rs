//! Error types for wait-for

use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

/// Exit code for a satisfied wait
pub const EXIT_SATISFIED: i32 = 0;
/// Exit code for runtime failures (I/O, identity, inotify, timeout)
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for usage and argument errors
pub const EXIT_USAGE: i32 = 2;

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("{0}")]
    Usage(String),

    #[error("could not stat awaited file {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("could not get passwd entry for the user: {0}")]
    AccountLookup(#[source] Errno),

    #[error("no passwd entry for uid {0}")]
    UnknownUid(u32),

    #[error("no such user: {0}")]
    UnknownUser(String),

    #[error("could not retrieve list of user groups for {user}: {source}")]
    GroupList {
        user: String,
        #[source]
        source: Errno,
    },

    #[error("inotify hung up (EOF)")]
    NotifyClosed,

    #[error("inotify read failed: {0}")]
    NotifyRead(#[source] Errno),

    #[error("could not render report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("timed out after {:.3}s waiting for {}", .elapsed.as_secs_f64(), .path.display())]
    TimedOut { path: PathBuf, elapsed: Duration },
}

impl WaitError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WaitError::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, WaitError::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, WaitError>;
