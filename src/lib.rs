//! wait-for - block until a file is ready
//!
//! Waits for a path to exist and, optionally, to be readable, writable or
//! executable for a given user according to its owner, group and other
//! permission bits. Changes are picked up through inotify on the parent
//! directory, falling back to polling when inotify cannot be used.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wait_for::{wait_for, RequestedModes, WaitConfig, WaitRequest};
//!
//! let request = WaitRequest::new("/run/app/ready", RequestedModes::new(true, false, false));
//! let config = WaitConfig::default().with_timeout(Duration::from_secs(30));
//! let outcome = wait_for(request, config).unwrap();
//! println!("ready after {} checks", outcome.evaluations);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod output;
pub mod permission;
pub mod watch;

pub use config::WaitConfig;
pub use error::{Result, WaitError};
pub use identity::{AccountSource, IdentityContext, SystemAccounts};
pub use output::{format_outcome, OutputFormat};
pub use permission::{evaluate, RequestedModes, Verdict};
pub use watch::{wait_for, SessionState, WaitOrchestrator, WaitOutcome, WaitRequest};
