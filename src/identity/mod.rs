//! User identity used for permission checks
//!
//! The identity is resolved once, before any waiting starts, from the
//! system account database. When a username is given it is resolved to its
//! own uid and primary gid; ownership checks then use that pair rather than
//! the caller's uid.

use std::ffi::CString;

use nix::unistd::{self, Gid, Uid, User};

use crate::error::{Result, WaitError};

/// Resolved user identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    username: String,
    uid: Uid,
    primary_gid: Gid,
    groups: Vec<Gid>,
}

impl IdentityContext {
    pub fn new(username: impl Into<String>, uid: Uid, primary_gid: Gid, groups: Vec<Gid>) -> Self {
        Self {
            username: username.into(),
            uid,
            primary_gid,
            groups,
        }
    }

    /// Resolve against the system account database
    pub fn resolve(username: Option<&str>) -> Result<Self> {
        Self::resolve_with(&SystemAccounts, username)
    }

    /// Resolve against an arbitrary account source
    pub fn resolve_with<A: AccountSource + ?Sized>(accounts: &A, username: Option<&str>) -> Result<Self> {
        let account = match username {
            Some("") => {
                return Err(WaitError::Usage("username cannot be zero-length".to_string()));
            }
            Some(name) => accounts
                .by_name(name)?
                .ok_or_else(|| WaitError::UnknownUser(name.to_string()))?,
            None => {
                let uid = accounts.current_uid();
                accounts
                    .by_uid(uid)?
                    .ok_or(WaitError::UnknownUid(uid.as_raw()))?
            }
        };

        let groups = accounts.group_list(&account.name, account.gid)?;

        Ok(Self {
            username: account.name,
            uid: account.uid,
            primary_gid: account.gid,
            groups,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn primary_gid(&self) -> Gid {
        self.primary_gid
    }

    /// Supplementary groups (may include the primary group)
    pub fn groups(&self) -> &[Gid] {
        &self.groups
    }

    /// Whether the identity belongs to `gid`, as primary or supplementary group
    pub fn is_member_of(&self, gid: Gid) -> bool {
        self.primary_gid == gid || self.groups.contains(&gid)
    }
}

/// Minimal account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid,
            gid: user.gid,
        }
    }
}

/// Account database lookups needed to build an identity
pub trait AccountSource {
    /// Real uid of the calling process
    fn current_uid(&self) -> Uid;

    fn by_uid(&self, uid: Uid) -> Result<Option<Account>>;

    fn by_name(&self, name: &str) -> Result<Option<Account>>;

    /// Full group list for `name`, including `primary`
    fn group_list(&self, name: &str, primary: Gid) -> Result<Vec<Gid>>;
}

/// passwd/group database of the running system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccounts;

impl AccountSource for SystemAccounts {
    fn current_uid(&self) -> Uid {
        unistd::getuid()
    }

    fn by_uid(&self, uid: Uid) -> Result<Option<Account>> {
        User::from_uid(uid)
            .map(|user| user.map(Account::from))
            .map_err(WaitError::AccountLookup)
    }

    fn by_name(&self, name: &str) -> Result<Option<Account>> {
        User::from_name(name)
            .map(|user| user.map(Account::from))
            .map_err(WaitError::AccountLookup)
    }

    fn group_list(&self, name: &str, primary: Gid) -> Result<Vec<Gid>> {
        let cname = CString::new(name)
            .map_err(|_| WaitError::Usage(format!("username contains a NUL byte: {:?}", name)))?;

        // nix grows the buffer until the whole list fits
        unistd::getgrouplist(&cname, primary).map_err(|source| WaitError::GroupList {
            user: name.to_string(),
            source,
        })
    }
}
