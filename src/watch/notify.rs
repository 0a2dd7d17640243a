//! inotify-backed wakeups for the target's parent directory

use std::os::fd::AsFd;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use tracing::{debug, trace};

use crate::error::{Result, WaitError};

/// Events that can change whether the target exists or what its bits are
pub const WATCH_MASK: AddWatchFlags = AddWatchFlags::IN_CREATE
    .union(AddWatchFlags::IN_ATTRIB)
    .union(AddWatchFlags::IN_MODIFY)
    .union(AddWatchFlags::IN_MOVED_FROM)
    .union(AddWatchFlags::IN_MOVED_TO)
    .union(AddWatchFlags::IN_DELETE_SELF)
    .union(AddWatchFlags::IN_MOVE_SELF);

/// Events after which the watch no longer covers the target's directory
const WATCH_LOST: AddWatchFlags = AddWatchFlags::IN_IGNORED
    .union(AddWatchFlags::IN_DELETE_SELF)
    .union(AddWatchFlags::IN_MOVE_SELF)
    .union(AddWatchFlags::IN_UNMOUNT);

/// Why a notification session could not be set up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Parent directory is absent or not reachable yet
    ParentUnavailable(Errno),
    /// inotify itself failed; worth telling the operator
    Unsupported {
        operation: &'static str,
        errno: Errno,
    },
}

impl Fallback {
    /// Whether the fallback should be reported
    pub fn is_noteworthy(&self) -> bool {
        matches!(self, Fallback::Unsupported { .. })
    }
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::ParentUnavailable(errno) => write!(f, "parent directory unavailable: {}", errno),
            Fallback::Unsupported { operation, errno } => write!(f, "{}: {}", operation, errno),
        }
    }
}

/// Result of one blocking wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// At least one event was queued
    Event,
    /// The deadline passed with nothing queued
    Deadline,
    /// The watched directory was removed, moved or unmounted
    WatchLost,
}

/// An open inotify instance with a single directory watch
///
/// Dropping the session removes the watch and closes the descriptor.
pub struct NotificationSession {
    inotify: Inotify,
    watch: Option<WatchDescriptor>,
}

impl NotificationSession {
    pub fn open(dir: &Path) -> std::result::Result<Self, Fallback> {
        let inotify = Inotify::init(InitFlags::IN_CLOEXEC).map_err(|errno| Fallback::Unsupported {
            operation: "could not initialize inotify subsystem",
            errno,
        })?;

        let watch = inotify.add_watch(dir, WATCH_MASK).map_err(|errno| match errno {
            Errno::ENOENT | Errno::ENOTDIR | Errno::EACCES => Fallback::ParentUnavailable(errno),
            errno => Fallback::Unsupported {
                operation: "could not initialize watch handle",
                errno,
            },
        })?;

        debug!(dir = %dir.display(), "watching directory");
        Ok(Self {
            inotify,
            watch: Some(watch),
        })
    }

    /// Block until at least one event is queued or `deadline` passes
    ///
    /// Event contents are discarded; callers re-check the file instead.
    /// Only the loss of the watch itself is reported.
    pub fn wait_for_event(&self, deadline: Option<Instant>) -> Result<Wakeup> {
        if let Some(deadline) = deadline {
            if !self.ready_before(deadline)? {
                return Ok(Wakeup::Deadline);
            }
        }

        loop {
            match self.inotify.read_events() {
                Ok(events) if events.is_empty() => return Err(WaitError::NotifyClosed),
                Ok(events) => {
                    trace!(count = events.len(), "inotify events");
                    if events.iter().any(|event| event.mask.intersects(WATCH_LOST)) {
                        debug!("watched directory went away");
                        return Ok(Wakeup::WatchLost);
                    }
                    return Ok(Wakeup::Event);
                }
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(WaitError::NotifyRead(errno)),
            }
        }
    }

    /// Wait for the descriptor to become readable, false on deadline
    fn ready_before(&self, deadline: Instant) -> Result<bool> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let timeout = poll_timeout(remaining);

            let mut fds = [PollFd::new(self.inotify.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, timeout) {
                Ok(0) => continue,
                Ok(_) => return Ok(true),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(WaitError::NotifyRead(errno)),
            }
        }
    }
}

/// Round up to whole milliseconds so a sub-millisecond remainder still sleeps
fn poll_timeout(remaining: Duration) -> PollTimeout {
    let millis = remaining.as_nanos().div_ceil(1_000_000);
    PollTimeout::try_from(Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX)))
        .unwrap_or(PollTimeout::MAX)
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.take() {
            // the kernel drops watches with the descriptor anyway
            let _ = self.inotify.rm_watch(watch);
        }
    }
}

impl std::fmt::Debug for NotificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSession")
            .field("watch", &self.watch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, Permissions};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn soon(ms: u64) -> Option<Instant> {
        Some(Instant::now() + Duration::from_millis(ms))
    }

    #[test]
    fn test_missing_parent_falls_back_quietly() {
        let temp_dir = TempDir::new().unwrap();
        let fallback = NotificationSession::open(&temp_dir.path().join("nope")).unwrap_err();

        assert_eq!(fallback, Fallback::ParentUnavailable(Errno::ENOENT));
        assert!(!fallback.is_noteworthy());
    }

    #[test]
    fn test_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        File::create(&file).unwrap();

        let fallback = NotificationSession::open(&file.join("below")).unwrap_err();
        assert_eq!(fallback, Fallback::ParentUnavailable(Errno::ENOTDIR));
    }

    #[test]
    fn test_create_wakes_up() {
        let temp_dir = TempDir::new().unwrap();
        let session = NotificationSession::open(temp_dir.path()).unwrap();

        File::create(temp_dir.path().join("new")).unwrap();
        assert_eq!(session.wait_for_event(soon(5_000)).unwrap(), Wakeup::Event);
    }

    #[test]
    fn test_chmod_wakes_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        File::create(&path).unwrap();

        let session = NotificationSession::open(temp_dir.path()).unwrap();
        fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
        assert_eq!(session.wait_for_event(soon(5_000)).unwrap(), Wakeup::Event);
    }

    #[test]
    fn test_rename_in_wakes_up() {
        let outer = TempDir::new().unwrap();
        let watched = outer.path().join("watched");
        fs::create_dir(&watched).unwrap();
        let staged = outer.path().join("staged");
        File::create(&staged).unwrap();

        let session = NotificationSession::open(&watched).unwrap();
        fs::rename(&staged, watched.join("final")).unwrap();
        assert_eq!(session.wait_for_event(soon(5_000)).unwrap(), Wakeup::Event);
    }

    #[test]
    fn test_quiet_directory_hits_deadline() {
        let temp_dir = TempDir::new().unwrap();
        let session = NotificationSession::open(temp_dir.path()).unwrap();

        let started = Instant::now();
        assert_eq!(session.wait_for_event(soon(50)).unwrap(), Wakeup::Deadline);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_removed_directory_loses_watch() {
        let outer = TempDir::new().unwrap();
        let watched = outer.path().join("watched");
        fs::create_dir(&watched).unwrap();

        let session = NotificationSession::open(&watched).unwrap();
        fs::remove_dir(&watched).unwrap();
        assert_eq!(session.wait_for_event(soon(5_000)).unwrap(), Wakeup::WatchLost);
    }

    #[test]
    fn test_moved_directory_loses_watch() {
        let outer = TempDir::new().unwrap();
        let watched = outer.path().join("watched");
        fs::create_dir(&watched).unwrap();

        let session = NotificationSession::open(&watched).unwrap();
        fs::rename(&watched, outer.path().join("elsewhere")).unwrap();
        assert_eq!(session.wait_for_event(soon(5_000)).unwrap(), Wakeup::WatchLost);
    }

    #[test]
    fn test_poll_timeout_rounds_up() {
        let one_ms = PollTimeout::try_from(Duration::from_millis(1)).unwrap();
        assert_eq!(poll_timeout(Duration::from_micros(300)), one_ms);
        assert_eq!(poll_timeout(Duration::from_nanos(1)), one_ms);

        let two_ms = PollTimeout::try_from(Duration::from_millis(2)).unwrap();
        assert_eq!(poll_timeout(Duration::from_micros(1_500)), two_ms);
        assert_eq!(poll_timeout(Duration::from_millis(2)), two_ms);
    }
}
