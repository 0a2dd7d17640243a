//! Requested access modes

use nix::sys::stat::Mode;
use std::fmt;

/// One of the three classic permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    pub const ALL: [Access; 3] = [Access::Read, Access::Write, Access::Execute];

    /// Owner, group and other bits for this access kind
    pub fn bits(self) -> (Mode, Mode, Mode) {
        match self {
            Access::Read => (Mode::S_IRUSR, Mode::S_IRGRP, Mode::S_IROTH),
            Access::Write => (Mode::S_IWUSR, Mode::S_IWGRP, Mode::S_IWOTH),
            Access::Execute => (Mode::S_IXUSR, Mode::S_IXGRP, Mode::S_IXOTH),
        }
    }
}

/// Set of access kinds to wait for. Empty means existence only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestedModes {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl RequestedModes {
    pub fn new(read: bool, write: bool, execute: bool) -> Self {
        Self { read, write, execute }
    }

    /// Existence-only request
    pub fn exists() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.execute)
    }

    pub fn contains(&self, access: Access) -> bool {
        match access {
            Access::Read => self.read,
            Access::Write => self.write,
            Access::Execute => self.execute,
        }
    }

    /// Requested access kinds in r, w, x order
    pub fn iter(&self) -> impl Iterator<Item = Access> + '_ {
        Access::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl fmt::Display for RequestedModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "exists");
        }
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.execute, 'x')
        )
    }
}
