//! Wait orchestration
//!
//! A wait resolves the identity once, then drives one of two loops until
//! the permission check passes or something fatal happens:
//!
//! - **watching**: block on inotify events for the parent directory and
//!   re-check after every wakeup
//! - **polling**: re-check on a fixed interval when inotify cannot be used
//!
//! The check always runs once before the first suspension and once after
//! every wakeup, so a change cannot slip between a wakeup and its check.

pub mod notify;
pub mod poll;
pub mod target;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::WaitConfig;
use crate::error::{Result, WaitError};
use crate::identity::{AccountSource, IdentityContext, SystemAccounts};
use crate::permission::{evaluate, RequestedModes, Verdict};

pub use notify::{Fallback, NotificationSession, Wakeup};
pub use poll::PollSession;
pub use target::TargetPath;

/// Lifecycle of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Watching,
    Polling,
    Satisfied,
    Failed,
}

impl SessionState {
    /// Allowed edges. Watching may degrade to Polling, never the reverse.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Uninitialized, Watching | Polling | Failed)
                | (Watching, Polling | Satisfied | Failed)
                | (Polling, Satisfied | Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Satisfied | SessionState::Failed)
    }
}

/// Which loop finished the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Watch,
    Poll,
}

/// What to wait for
#[derive(Debug, Clone)]
pub struct WaitRequest {
    pub target: TargetPath,
    pub modes: RequestedModes,
    /// Identity to check for; the caller's own when `None`
    pub username: Option<String>,
}

impl WaitRequest {
    pub fn new(path: impl Into<PathBuf>, modes: RequestedModes) -> Self {
        Self {
            target: TargetPath::new(path),
            modes,
            username: None,
        }
    }

    pub fn for_user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Summary of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    pub driver: Driver,
    pub evaluations: u64,
    pub wakeups: u64,
    pub elapsed: Duration,
}

/// Drives a single wait to completion
pub struct WaitOrchestrator {
    request: WaitRequest,
    config: WaitConfig,
    state: SessionState,
    evaluations: u64,
    wakeups: u64,
}

impl WaitOrchestrator {
    pub fn new(request: WaitRequest, config: WaitConfig) -> Self {
        Self {
            request,
            config,
            state: SessionState::Uninitialized,
            evaluations: 0,
            wakeups: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Wait using the system account database
    pub fn run(self) -> Result<WaitOutcome> {
        self.run_with(&SystemAccounts)
    }

    pub fn run_with<A: AccountSource + ?Sized>(mut self, accounts: &A) -> Result<WaitOutcome> {
        let started = Instant::now();
        let result = self.drive(accounts, started);

        match &result {
            Ok(outcome) => {
                self.transition(SessionState::Satisfied);
                debug!(
                    driver = ?outcome.driver,
                    evaluations = outcome.evaluations,
                    wakeups = outcome.wakeups,
                    "condition satisfied"
                );
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                debug!(error = %err, "wait failed");
            }
        }

        result
    }

    fn drive<A: AccountSource + ?Sized>(&mut self, accounts: &A, started: Instant) -> Result<WaitOutcome> {
        let identity = IdentityContext::resolve_with(accounts, self.request.username.as_deref())?;
        debug!(
            user = identity.username(),
            uid = identity.uid().as_raw(),
            gid = identity.primary_gid().as_raw(),
            groups = identity.groups().len(),
            "resolved identity"
        );

        // a deadline past the end of the clock is no deadline at all
        let deadline = self.config.timeout.and_then(|timeout| started.checked_add(timeout));

        if let Some(session) = self.open_session() {
            self.transition(SessionState::Watching);
            if let Some(outcome) = self.watch(&session, &identity, deadline, started)? {
                return Ok(outcome);
            }
            // dropping the session releases the dead watch and the descriptor
            drop(session);
            debug!(dir = %self.request.target.parent().display(), "watch lost, polling instead");
        }

        self.transition(SessionState::Polling);
        let poller = PollSession::new(self.config.poll_interval);
        self.poll(&poller, &identity, deadline, started)
    }

    fn open_session(&self) -> Option<NotificationSession> {
        if self.config.force_poll {
            debug!("polling requested, skipping inotify");
            return None;
        }

        let dir = self.request.target.parent();
        match NotificationSession::open(dir) {
            Ok(session) => Some(session),
            Err(fallback) if fallback.is_noteworthy() => {
                warn!("{} (falling back to poll mechanism)", fallback);
                None
            }
            Err(fallback) => {
                debug!(dir = %dir.display(), "{}, polling instead", fallback);
                None
            }
        }
    }

    /// Returns `None` when the watch died and polling has to take over
    fn watch(
        &mut self,
        session: &NotificationSession,
        identity: &IdentityContext,
        deadline: Option<Instant>,
        started: Instant,
    ) -> Result<Option<WaitOutcome>> {
        loop {
            if self.check(identity)? {
                return Ok(Some(self.outcome(Driver::Watch, started)));
            }

            match session.wait_for_event(deadline)? {
                Wakeup::Event => self.wakeups += 1,
                Wakeup::WatchLost => {
                    self.wakeups += 1;
                    return Ok(None);
                }
                Wakeup::Deadline => return Err(self.timed_out(started)),
            }
        }
    }

    fn poll(
        &mut self,
        poller: &PollSession,
        identity: &IdentityContext,
        deadline: Option<Instant>,
        started: Instant,
    ) -> Result<WaitOutcome> {
        loop {
            if self.check(identity)? {
                return Ok(self.outcome(Driver::Poll, started));
            }

            if !poller.sleep(deadline) {
                return Err(self.timed_out(started));
            }
            self.wakeups += 1;
        }
    }

    fn check(&mut self, identity: &IdentityContext) -> Result<bool> {
        self.evaluations += 1;
        match evaluate(self.request.target.path(), &self.request.modes, identity) {
            Verdict::Satisfied => Ok(true),
            Verdict::NotYet => Ok(false),
            Verdict::Fatal(err) => Err(err),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn outcome(&self, driver: Driver, started: Instant) -> WaitOutcome {
        WaitOutcome {
            driver,
            evaluations: self.evaluations,
            wakeups: self.wakeups,
            elapsed: started.elapsed(),
        }
    }

    fn timed_out(&self, started: Instant) -> WaitError {
        WaitError::TimedOut {
            path: self.request.target.path().to_path_buf(),
            elapsed: started.elapsed(),
        }
    }
}

/// Convenience wrapper: wait for `request` with the system account database
pub fn wait_for(request: WaitRequest, config: WaitConfig) -> Result<WaitOutcome> {
    WaitOrchestrator::new(request, config).run()
}
