use crate::models::{
    CheckResult, DocumentModel, Issue, Outcome, Report, Severity, SeverityCounts, Skipped, Success,
};
use crate::validator::Rule;

/// Assembles a [`Report`] for one story
pub struct ReportBuilder<'a> {
    story: &'a DocumentModel,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(story: &'a DocumentModel) -> Self {
        Self { story }
    }

    /// Combine check results and classified issues into a report
    ///
    /// Only applicable checks enter the pass rate; not-applicable ones are
    /// listed separately with their reason.
    pub fn build(&self, results: &[CheckResult], issues: Vec<Issue>) -> Report {
        let applicable = results.iter().filter(|r| r.applicable);
        let total_checks = applicable.clone().count();
        let passed_checks = applicable.filter(|r| r.passed).count();

        let successes = results
            .iter()
            .filter(|r| r.applicable && r.passed)
            .map(|r| Success {
                rule_id: r.rule_id.clone(),
                description: Rule::from_id(&r.rule_id)
                    .map(|rule| rule.description().to_string())
                    .unwrap_or_else(|| r.message.clone()),
                evidence: r.evidence.clone(),
            })
            .collect();

        let not_applicable = results
            .iter()
            .filter(|r| !r.applicable)
            .map(|r| Skipped {
                rule_id: r.rule_id.clone(),
                reason: r
                    .message
                    .strip_prefix("not applicable: ")
                    .unwrap_or(&r.message)
                    .to_string(),
            })
            .collect();

        let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
        let counts = SeverityCounts {
            critical: count(Severity::Critical),
            major: count(Severity::Major),
            minor: count(Severity::Minor),
        };

        Report {
            document_path: self.story.path.clone(),
            title: self.story.title.clone(),
            story_key: self.story.story_key.clone(),
            checksum: self.story.checksum.clone(),
            outcome: Outcome::from_issues(&issues),
            total_checks,
            passed_checks,
            counts,
            issues,
            successes,
            not_applicable,
            citations: self.story.citations.clone(),
        }
    }
}
