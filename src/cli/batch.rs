//! Batch command: validate every story in a directory as a sequence

use crate::cli::{summary_line, EXIT_ERROR};
use crate::error::ValidatorError;
use crate::models::{DocumentModel, Outcome};
use crate::parser::parse_story;
use crate::report::{render, ReportFormat};
use crate::validator::{read_document, Validator};
use crate::Result;
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Suffix of report files written next to (or instead of) stories
const REPORT_SUFFIX: &str = "-validation";

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory containing story files
    pub dir: PathBuf,

    /// Directory of project documents citations may point at
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,

    /// Tech spec holding the authoritative acceptance criteria
    #[arg(long)]
    pub tech_spec: Option<PathBuf>,

    /// Report format for saved reports
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write one report per story into this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number(u64),
    Text(String),
}

/// Sort key comparing digit runs numerically (`1-2` before `1-10`)
fn natural_key(name: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for c in name.chars() {
        if c.is_ascii_digit() != in_digits && !current.is_empty() {
            chunks.push(make_chunk(&current, in_digits));
            current.clear();
        }
        in_digits = c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(make_chunk(&current, in_digits));
    }
    chunks
}

fn make_chunk(text: &str, digits: bool) -> Chunk {
    if digits {
        if let Ok(n) = text.parse() {
            return Chunk::Number(n);
        }
    }
    Chunk::Text(text.to_lowercase())
}

fn natural_cmp(a: &Path, b: &Path) -> Ordering {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    natural_key(&name(a))
        .cmp(&natural_key(&name(b)))
        .then_with(|| a.cmp(b))
}

/// Story candidates in natural order, skipping earlier reports
pub fn collect_stories(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read stories directory {}", dir.display()))?;

    let mut stories = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let ext = path.extension().map(|e| e.to_string_lossy()).unwrap_or_default();
        if stem.ends_with(REPORT_SUFFIX) || !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            continue;
        }
        stories.push(path);
    }

    stories.sort_by(|a, b| natural_cmp(a, b));
    Ok(stories)
}

fn report_path(output_dir: &Path, story: &Path, format: ReportFormat) -> PathBuf {
    let stem = story.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    output_dir.join(format!("{}{}.{}", stem, REPORT_SUFFIX, format.extension()))
}

/// Returns the process exit code: worst of the individual outcomes
pub fn run(args: BatchArgs, validator: &Validator) -> Result<u8> {
    let stories = collect_stories(&args.dir, &validator.config().doc_extensions)?;
    if stories.is_empty() {
        println!("{}", format!("No story files found in {}", args.dir.display()).yellow());
        return Ok(0);
    }

    let tech_spec = match &args.tech_spec {
        Some(path) => Some(validator.load_tech_spec(path)?),
        None => None,
    };

    let mut extra: Vec<&Path> = stories.iter().map(PathBuf::as_path).collect();
    extra.extend(args.tech_spec.as_deref());
    let index = validator.known_docs(args.docs_dir.as_deref(), &extra)?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    println!(
        "{}",
        format!("📋 Validating {} file(s) in {}", stories.len(), args.dir.display()).cyan()
    );

    let mut exit_code = 0u8;
    let mut validated = 0usize;
    let mut skipped = 0usize;
    let mut previous: Option<DocumentModel> = None;

    for path in &stories {
        let parsed = read_document(path).and_then(|text| {
            parse_story(&text, &validator.doc_path(path)).map_err(ValidatorError::from)
        });
        let story = match parsed {
            Ok(story) => story,
            Err(err) if err.is_skippable() => {
                tracing::warn!(error = %err, "skipping non-story document");
                println!("{}", format!("   ⊘ skipped {}: not a story", path.display()).bright_black());
                skipped += 1;
                continue;
            }
            Err(err) => {
                eprintln!("{}", format!("   ✗ {}", err).red());
                exit_code = EXIT_ERROR;
                continue;
            }
        };

        let report = validator.validate_model(story.clone(), previous.as_ref(), tech_spec.as_ref(), &index);
        previous = Some(story);
        validated += 1;

        if report.outcome == Outcome::Fail && exit_code == 0 {
            exit_code = Outcome::Fail.exit_code();
        }

        println!("   {}", summary_line(&report));
        if let Some(dir) = &args.output_dir {
            let target = report_path(dir, path, args.format);
            std::fs::write(&target, render(&report, args.format)?)
                .with_context(|| format!("Failed to write report to {}", target.display()))?;
            tracing::info!(report = %target.display(), "report written");
        }
    }

    println!(
        "\n{}",
        format!("Validated {} story file(s), skipped {}", validated, skipped).bold()
    );
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["1-10-b.md", "1-2-a.md", "2-1-c.md", "1-1-z.md"];
        names.sort_by(|a, b| natural_cmp(Path::new(a), Path::new(b)));
        assert_eq!(names, vec!["1-1-z.md", "1-2-a.md", "1-10-b.md", "2-1-c.md"]);
    }

    #[test]
    fn test_collect_skips_reports_and_other_files() {
        let dir = TempDir::new().unwrap();
        for name in ["1-2-b.md", "1-1-a.md", "1-1-a-validation.md", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let stories = collect_stories(dir.path(), &["md".to_string()]).unwrap();
        let names: Vec<_> = stories
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1-1-a.md", "1-2-b.md"]);
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("out"), Path::new("stories/1-2-login.md"), ReportFormat::Json);
        assert_eq!(path, PathBuf::from("out/1-2-login-validation.json"));
    }
}
