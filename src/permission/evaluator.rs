//! Permission predicate
//!
//! Every evaluation starts from a fresh `stat(2)`; nothing is cached
//! between calls.

use std::path::Path;

use nix::errno::Errno;
use nix::sys::stat::{self, Mode};
use nix::unistd::{Gid, Uid};

use crate::error::WaitError;
use crate::identity::IdentityContext;
use crate::permission::RequestedModes;

/// Outcome of one evaluation
#[derive(Debug)]
pub enum Verdict {
    Satisfied,
    NotYet,
    Fatal(WaitError),
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }

    pub fn is_not_yet(&self) -> bool {
        matches!(self, Verdict::NotYet)
    }
}

/// Ownership and mode bits of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub uid: Uid,
    pub gid: Gid,
    pub mode: Mode,
}

impl From<libc::stat> for FileStat {
    fn from(st: libc::stat) -> Self {
        Self {
            uid: Uid::from_raw(st.st_uid),
            gid: Gid::from_raw(st.st_gid),
            mode: Mode::from_bits_truncate(st.st_mode),
        }
    }
}

/// Errors that mean "not there yet" rather than failure
fn is_transient(errno: Errno) -> bool {
    matches!(errno, Errno::ENOENT | Errno::EACCES | Errno::ENOTDIR | Errno::ETXTBSY)
}

/// Check `path` against `modes` for `identity`
pub fn evaluate(path: &Path, modes: &RequestedModes, identity: &IdentityContext) -> Verdict {
    match stat::stat(path) {
        Ok(st) => {
            if check_modes(&FileStat::from(st), modes, identity) {
                Verdict::Satisfied
            } else {
                Verdict::NotYet
            }
        }
        Err(errno) if is_transient(errno) => Verdict::NotYet,
        Err(source) => Verdict::Fatal(WaitError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Owner/group/other rule applied to every requested mode
pub fn check_modes(file: &FileStat, modes: &RequestedModes, identity: &IdentityContext) -> bool {
    let is_owner = file.uid == identity.uid();
    let is_in_group = identity.is_member_of(file.gid);

    modes.iter().all(|access| {
        let (owner, group, other) = access.bits();
        (is_owner && file.mode.contains(owner))
            || (is_in_group && file.mode.contains(group))
            || file.mode.contains(other)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, Permissions};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn me() -> IdentityContext {
        IdentityContext::new("me", nix::unistd::getuid(), nix::unistd::getgid(), vec![])
    }

    fn stranger() -> IdentityContext {
        IdentityContext::new("stranger", Uid::from_raw(54321), Gid::from_raw(54321), vec![])
    }

    fn snapshot(uid: u32, gid: u32, bits: u32) -> FileStat {
        FileStat {
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
            mode: Mode::from_bits_truncate(bits),
        }
    }

    fn create(dir: &TempDir, name: &str, bits: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        fs::set_permissions(&path, Permissions::from_mode(bits)).unwrap();
        path
    }

    #[test]
    fn test_missing_path_is_not_yet() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing");

        let verdict = evaluate(&path, &RequestedModes::exists(), &me());
        assert!(verdict.is_not_yet());

        let verdict = evaluate(&path, &RequestedModes::new(true, true, true), &me());
        assert!(verdict.is_not_yet());
    }

    #[test]
    fn test_missing_ancestor_is_not_yet() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/c/file");
        assert!(evaluate(&path, &RequestedModes::exists(), &me()).is_not_yet());
    }

    #[test]
    fn test_file_component_in_path_is_not_yet() {
        let temp_dir = TempDir::new().unwrap();
        let file = create(&temp_dir, "plain", 0o644);
        let path = file.join("child");
        assert!(evaluate(&path, &RequestedModes::exists(), &me()).is_not_yet());
    }

    #[test]
    fn test_existence_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = create(&temp_dir, "file", 0o000);
        assert!(evaluate(&path, &RequestedModes::exists(), &stranger()).is_satisfied());
    }

    #[test]
    fn test_owner_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = create(&temp_dir, "file", 0o644);

        let read = RequestedModes::new(true, false, false);
        assert!(evaluate(&path, &read, &me()).is_satisfied());

        let exec = RequestedModes::new(false, false, true);
        assert!(evaluate(&path, &exec, &me()).is_not_yet());
    }

    #[test]
    fn test_private_file_for_stranger() {
        let temp_dir = TempDir::new().unwrap();
        let path = create(&temp_dir, "file", 0o700);
        let write = RequestedModes::new(false, true, false);

        assert!(evaluate(&path, &write, &stranger()).is_not_yet());
        assert!(evaluate(&path, &write, &me()).is_satisfied());

        fs::set_permissions(&path, Permissions::from_mode(0o702)).unwrap();
        assert!(evaluate(&path, &write, &stranger()).is_satisfied());
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let path = create(&temp_dir, "file", 0o640);
        let modes = RequestedModes::new(true, true, false);

        for _ in 0..5 {
            assert!(evaluate(&path, &modes, &me()).is_satisfied());
            assert!(evaluate(&path, &modes, &stranger()).is_not_yet());
        }
    }

    #[test]
    fn test_all_modes_must_pass() {
        let owner = IdentityContext::new("o", Uid::from_raw(10), Gid::from_raw(10), vec![]);
        let file = snapshot(10, 10, 0o600);

        assert!(check_modes(&file, &RequestedModes::new(true, true, false), &owner));
        assert!(!check_modes(&file, &RequestedModes::new(true, true, true), &owner));
    }

    #[test]
    fn test_group_bits_via_supplementary_group() {
        let member = IdentityContext::new(
            "m",
            Uid::from_raw(20),
            Gid::from_raw(20),
            vec![Gid::from_raw(20), Gid::from_raw(300)],
        );
        let file = snapshot(10, 300, 0o050);

        assert!(check_modes(&file, &RequestedModes::new(true, false, true), &member));
        assert!(!check_modes(&file, &RequestedModes::new(false, true, false), &member));
    }

    #[test]
    fn test_group_bits_via_primary_group() {
        let member = IdentityContext::new("m", Uid::from_raw(20), Gid::from_raw(300), vec![]);
        let file = snapshot(10, 300, 0o020);
        assert!(check_modes(&file, &RequestedModes::new(false, true, false), &member));
    }

    #[test]
    fn test_other_bits_apply_to_everyone() {
        let owner = IdentityContext::new("o", Uid::from_raw(10), Gid::from_raw(10), vec![]);
        // owner bits cleared, other bits set: the owner still passes
        let file = snapshot(10, 10, 0o004);
        assert!(check_modes(&file, &RequestedModes::new(true, false, false), &owner));
    }

    #[test]
    fn test_owner_bits_do_not_leak_to_others() {
        let file = snapshot(10, 10, 0o700);
        let other = IdentityContext::new("x", Uid::from_raw(11), Gid::from_raw(11), vec![]);
        assert!(!check_modes(&file, &RequestedModes::new(true, false, false), &other));
    }

    #[test]
    fn test_overlong_name_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("n".repeat(300));

        match evaluate(&path, &RequestedModes::exists(), &me()) {
            Verdict::Fatal(WaitError::Stat { source, path: failed }) => {
                assert_eq!(source, Errno::ENAMETOOLONG);
                assert_eq!(failed, path);
            }
            other => panic!("expected a stat failure, got {:?}", other),
        }
    }

    #[test]
    fn test_symlink_loop_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::os::unix::fs::symlink(&b, &a).unwrap();
        std::os::unix::fs::symlink(&a, &b).unwrap();

        let verdict = evaluate(&a, &RequestedModes::new(true, false, false), &me());
        assert!(matches!(
            verdict,
            Verdict::Fatal(WaitError::Stat { source: Errno::ELOOP, .. })
        ));
    }
}
