//! Report rendering
//!
//! Output depends only on the [`Report`] value: no timestamps, no map
//! iteration, so identical inputs render to identical bytes.

use crate::error::ValidatorResult;
use crate::models::{Issue, Outcome, Report, Severity};

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    #[value(name = "md", alias = "markdown")]
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension used for saved reports
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &Report, format: ReportFormat) -> ValidatorResult<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Json => render_json(report),
    }
}

/// Pretty JSON with a trailing newline
pub fn render_json(report: &Report) -> ValidatorResult<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

fn counts_line(report: &Report) -> String {
    format!(
        "Critical: {}, Major: {}, Minor: {}",
        report.counts.critical, report.counts.major, report.counts.minor
    )
}

fn push_issue(output: &mut String, number: usize, issue: &Issue) {
    output.push_str(&format!("{}. **{}**\n", number, issue.description));
    let rules: Vec<String> = issue.rule_ids.iter().map(|id| format!("`{}`", id)).collect();
    output.push_str(&format!("   - Rules: {}\n", rules.join(", ")));
    for line in &issue.evidence {
        output.push_str(&format!("   - Evidence: {}\n", line));
    }
    if !issue.recommendation.is_empty() {
        output.push_str(&format!("   - Recommendation: {}\n", issue.recommendation));
    }
}

/// Render the Markdown validation report
pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Story Quality Validation Report\n\n");
    let story = report.title.as_deref().unwrap_or(&report.document_path);
    output.push_str(&format!("**Story:** {}\n", story));
    output.push_str(&format!("**Document:** {}\n", report.document_path));
    output.push_str(&format!("**Checksum:** {}\n", report.checksum));
    output.push_str(&format!(
        "**Outcome:** {} {} ({})\n\n",
        report.outcome.emoji(),
        report.outcome.name(),
        counts_line(report)
    ));

    // Summary
    output.push_str("## Summary\n\n");
    output.push_str(&format!("{}\n\n", report.pass_rate_line()));
    output.push_str("| Severity | Count |\n");
    output.push_str("|----------|-------|\n");
    for severity in Severity::ALL {
        output.push_str(&format!(
            "| {} {} | {} |\n",
            severity.symbol(),
            severity.name(),
            report.counts.get(severity)
        ));
    }
    if !report.not_applicable.is_empty() {
        output.push_str("\nNot applicable (excluded from the pass rate):\n\n");
        for skipped in &report.not_applicable {
            output.push_str(&format!("- `{}`: {}\n", skipped.rule_id, skipped.reason));
        }
    }

    // Issues, most severe first, execution order within a tier
    for severity in Severity::ALL {
        output.push_str(&format!("\n## {} Issues\n\n", severity.name()));
        let issues: Vec<&Issue> = report.issues_with(severity).collect();
        if issues.is_empty() {
            output.push_str("None.\n");
            continue;
        }
        for (idx, issue) in issues.iter().enumerate() {
            push_issue(&mut output, idx + 1, issue);
        }
    }

    output.push_str("\n## Successes\n\n");
    if report.successes.is_empty() {
        output.push_str("None.\n");
    }
    for success in &report.successes {
        output.push_str(&format!("- ✓ `{}` {}\n", success.rule_id, success.description));
        for line in &success.evidence {
            output.push_str(&format!("  - {}\n", line));
        }
    }

    output.push_str("\n## Recommendations\n\n");
    if report.issues.is_empty() {
        output.push_str("No changes required.\n");
    } else {
        for (severity, heading) in [
            (Severity::Critical, "Must Fix"),
            (Severity::Major, "Should Improve"),
            (Severity::Minor, "Consider"),
        ] {
            let mut seen: Vec<&str> = Vec::new();
            for issue in report.issues_with(severity) {
                let text = if issue.recommendation.is_empty() {
                    issue.description.as_str()
                } else {
                    issue.recommendation.as_str()
                };
                if !seen.contains(&text) {
                    seen.push(text);
                }
            }
            if seen.is_empty() {
                continue;
            }
            output.push_str(&format!("### {}\n\n", heading));
            for (idx, text) in seen.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", idx + 1, text));
            }
            output.push('\n');
        }
        // keep exactly one blank line before the next heading
        while output.ends_with("\n\n") {
            output.pop();
        }
    }

    output.push_str("\n## Validation Outcome\n\n");
    let verdict = match report.outcome {
        Outcome::Pass => "all applicable checks passed.".to_string(),
        Outcome::PassWithIssues => format!(
            "no critical issues; {} major and {} minor issue(s) to address.",
            report.counts.major, report.counts.minor
        ),
        Outcome::Fail => format!(
            "{} critical issue(s) must be resolved before development starts.",
            report.counts.critical
        ),
    };
    output.push_str(&format!("**{}**: {}\n", report.outcome.name(), verdict));

    output
}
