//! Validate command

use crate::cli::summary_line;
use crate::models::Outcome;
use crate::report::{render, ReportFormat};
use crate::validator::{ValidationRequest, Validator};
use crate::Result;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Story markdown file to validate
    pub story: PathBuf,

    /// Previous story in the sequence (enables continuity checks)
    #[arg(long)]
    pub previous: Option<PathBuf>,

    /// Tech spec holding the authoritative acceptance criteria
    #[arg(long)]
    pub tech_spec: Option<PathBuf>,

    /// Directory of project documents citations may point at
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ValidateArgs, validator: &Validator) -> Result<Outcome> {
    let request = ValidationRequest {
        story: args.story,
        previous: args.previous,
        tech_spec: args.tech_spec,
        docs_dir: args.docs_dir,
    };

    let report = validator
        .validate_files(&request)
        .with_context(|| format!("Failed to validate {}", request.story.display()))?;
    let rendered = render(&report, args.format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("{}", summary_line(&report));
            println!("   Report: {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(report.outcome)
}
