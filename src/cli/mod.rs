pub mod batch;
pub mod rules;
pub mod validate;

pub use batch::BatchArgs;
pub use validate::ValidateArgs;

use crate::models::{Outcome, Report, ValidatorConfig};
use crate::Result;
use anyhow::Context;
use colored::{ColoredString, Colorize};
use std::path::Path;

/// Exit code for parse, I/O and usage errors
pub const EXIT_ERROR: u8 = 2;

/// Load configuration for a command run from the current directory
pub fn load_config(explicit: Option<&Path>) -> Result<ValidatorConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = ValidatorConfig::load(explicit, &cwd).context("Failed to load configuration")?;
    Ok(config)
}

/// Coloured outcome label for console summaries
pub fn outcome_label(outcome: Outcome) -> ColoredString {
    let label = format!("{} {}", outcome.emoji(), outcome.name());
    match outcome {
        Outcome::Pass => label.green(),
        Outcome::PassWithIssues => label.yellow(),
        Outcome::Fail => label.red(),
    }
}

/// One-line console summary of a report
pub fn summary_line(report: &Report) -> String {
    format!(
        "{}  {}  {} ({} critical, {} major, {} minor)",
        outcome_label(report.outcome),
        report.document_path,
        report.pass_rate_line(),
        report.counts.critical,
        report.counts.major,
        report.counts.minor
    )
}
