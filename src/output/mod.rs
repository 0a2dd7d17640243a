//! Success report

use serde::Serialize;

use crate::error::Result;
use crate::watch::{Driver, WaitOutcome, WaitRequest};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Print nothing on success
    #[default]
    Quiet,
    Json,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    path: String,
    modes: String,
    user: Option<&'a str>,
    driver: Driver,
    evaluations: u64,
    wakeups: u64,
    elapsed_ms: u128,
    completed_at: String,
}

/// Render the outcome of a successful wait, if the format prints anything
pub fn format_outcome(request: &WaitRequest, outcome: &WaitOutcome, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Quiet => Ok(None),
        OutputFormat::Json => {
            let report = Report {
                path: request.target.path().display().to_string(),
                modes: request.modes.to_string(),
                user: request.username.as_deref(),
                driver: outcome.driver,
                evaluations: outcome.evaluations,
                wakeups: outcome.wakeups,
                elapsed_ms: outcome.elapsed.as_millis(),
                completed_at: chrono::Utc::now().to_rfc3339(),
            };
            Ok(Some(serde_json::to_string(&report)?))
        }
    }
}
