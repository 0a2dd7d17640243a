//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::config::WaitConfig;
use crate::error::{Result, WaitError};
use crate::output::OutputFormat;
use crate::permission::RequestedModes;
use crate::watch::WaitRequest;

#[derive(Parser, Debug)]
#[command(name = "wait-for")]
#[command(
    author,
    version,
    about = "Waits for a file to exist and optionally have one or more modes",
    long_about = None,
    after_help = "If multiple modes are specified, wait-for waits for all of them to become available"
)]
pub struct Args {
    /// Wait for the file to become executable
    #[arg(short = 'x', long)]
    pub execute: bool,

    /// Wait for the file to become readable
    #[arg(short, long)]
    pub read: bool,

    /// Wait for the file to become writable
    #[arg(short, long)]
    pub write: bool,

    /// The username to run access checks for (NOT the user ID)
    #[arg(short = 'U', long, env = "WAIT_FOR_USER")]
    pub username: Option<String>,

    /// Give up after this many seconds (fractions allowed)
    #[arg(long, value_name = "SECS", env = "WAIT_FOR_TIMEOUT")]
    pub timeout: Option<f64>,

    /// Polling interval in milliseconds when inotify is unavailable
    #[arg(long, value_name = "MS", default_value_t = 10, env = "WAIT_FOR_POLL_INTERVAL")]
    pub interval: u64,

    /// Always poll instead of using inotify
    #[arg(long, env = "WAIT_FOR_FORCE_POLL")]
    pub poll: bool,

    /// Print a JSON report on success
    #[arg(long)]
    pub json: bool,

    /// Verbose diagnostics on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The file to wait for
    #[arg(value_name = "FILE", num_args = 0..)]
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn modes(&self) -> RequestedModes {
        RequestedModes::new(self.read, self.write, self.execute)
    }

    /// Build the wait request, enforcing exactly one target
    pub fn request(&self) -> Result<WaitRequest> {
        let file = match self.files.as_slice() {
            [file] => file.clone(),
            files => {
                return Err(WaitError::Usage(format!(
                    "expected exactly one positional argument (the file to wait for) - got {}",
                    files.len()
                )))
            }
        };

        if matches!(self.username.as_deref(), Some("")) {
            return Err(WaitError::Usage("username cannot be zero-length".to_string()));
        }

        let mut request = WaitRequest::new(file, self.modes());
        request.username = self.username.clone();
        Ok(request)
    }

    pub fn config(&self) -> Result<WaitConfig> {
        WaitConfig::from_args(self.timeout, self.interval, self.poll)
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Quiet
        }
    }
}
