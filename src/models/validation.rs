use crate::models::Citation;
use serde::{Deserialize, Serialize};

/// Severity tier of a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks progress, must be fixed
    Critical,
    /// Should be fixed
    Major,
    /// Optional improvement
    Minor,
}

impl Severity {
    /// All tiers, most severe first
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Major, Severity::Minor];

    /// Get display symbol for severity
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Major => "🟡",
            Severity::Minor => "🔵",
        }
    }

    /// Get display name for severity
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Major => "Major",
            Severity::Minor => "Minor",
        }
    }

    /// Higher is more severe
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::Major => 2,
            Severity::Minor => 1,
        }
    }

    /// The more severe of two tiers
    pub fn max(self, other: Severity) -> Severity {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// One concrete defect found by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub description: String,
    pub recommendation: String,
    /// Key shared by findings that describe the same underlying defect
    pub root_cause: Option<String>,
    /// Location or quote specific to this finding
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(description: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            recommendation: recommendation.into(),
            root_cause: None,
            evidence: None,
        }
    }

    pub fn with_root_cause(mut self, key: impl Into<String>) -> Self {
        self.root_cause = Some(key.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Outcome of evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub rule_id: String,
    pub passed: bool,
    /// False when the rule could not be evaluated; such results never count
    pub applicable: bool,
    /// Quotes and locations supporting the verdict
    pub evidence: Vec<String>,
    pub message: String,
    pub findings: Vec<Finding>,
}

impl CheckResult {
    pub fn pass(rule_id: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            passed: true,
            applicable: true,
            evidence: Vec::new(),
            message: message.into(),
            findings: Vec::new(),
        }
    }

    pub fn fail(rule_id: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            passed: false,
            applicable: true,
            evidence: Vec::new(),
            message: message.into(),
            findings: Vec::new(),
        }
    }

    /// A rule that cannot evaluate is reported as not passed and excluded from scoring
    pub fn not_applicable(rule_id: &str, reason: impl AsRef<str>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            passed: false,
            applicable: false,
            evidence: Vec::new(),
            message: format!("not applicable: {}", reason.as_ref()),
            findings: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.applicable && !self.passed
    }
}

/// A reportable defect derived from failed checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    /// Rules that reported this defect, in execution order
    pub rule_ids: Vec<String>,
    pub description: String,
    pub recommendation: String,
    pub evidence: Vec<String>,
}

/// Overall verdict of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    PassWithIssues,
    Fail,
}

impl Outcome {
    /// Derive the outcome from the issue list
    pub fn from_issues(issues: &[Issue]) -> Self {
        if issues.iter().any(|i| i.severity == Severity::Critical) {
            Outcome::Fail
        } else if issues.is_empty() {
            Outcome::Pass
        } else {
            Outcome::PassWithIssues
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::PassWithIssues => "PASS WITH ISSUES",
            Outcome::Fail => "FAIL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Outcome::Pass => "✅",
            Outcome::PassWithIssues => "⚠️",
            Outcome::Fail => "❌",
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Pass | Outcome::PassWithIssues => 0,
            Outcome::Fail => 1,
        }
    }
}

/// A check that passed, kept for the report's successes section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Success {
    pub rule_id: String,
    pub description: String,
    pub evidence: Vec<String>,
}

/// A check excluded from scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub rule_id: String,
    pub reason: String,
}

/// Issue counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Major => self.major,
            Severity::Minor => self.minor,
        }
    }
}

/// Final validation report for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub document_path: String,
    pub title: Option<String>,
    pub story_key: Option<String>,
    pub checksum: String,
    pub outcome: Outcome,
    /// Applicable checks only
    pub total_checks: usize,
    pub passed_checks: usize,
    pub counts: SeverityCounts,
    pub issues: Vec<Issue>,
    pub successes: Vec<Success>,
    pub not_applicable: Vec<Skipped>,
    /// Story citations with their resolution state
    pub citations: Vec<Citation>,
}

impl Report {
    /// Pass rate as a whole percentage, rounded half-up
    ///
    /// Returns `None` when no check was applicable.
    pub fn pass_rate(&self) -> Option<usize> {
        if self.total_checks == 0 {
            return None;
        }
        Some((self.passed_checks * 200 + self.total_checks) / (self.total_checks * 2))
    }

    /// `23/24 checks passed (96%)`
    pub fn pass_rate_line(&self) -> String {
        let rate = match self.pass_rate() {
            Some(pct) => format!("{}%", pct),
            None => "n/a".to_string(),
        };
        format!(
            "{}/{} checks passed ({})",
            self.passed_checks, self.total_checks, rate
        )
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> Issue {
        Issue {
            severity,
            rule_ids: vec!["r".to_string()],
            description: "d".to_string(),
            recommendation: "r".to_string(),
            evidence: vec![],
        }
    }

    fn report(passed: usize, total: usize) -> Report {
        Report {
            document_path: "s.md".to_string(),
            title: None,
            story_key: None,
            checksum: String::new(),
            outcome: Outcome::Pass,
            total_checks: total,
            passed_checks: passed,
            counts: SeverityCounts::default(),
            issues: vec![],
            successes: vec![],
            not_applicable: vec![],
            citations: vec![],
        }
    }

    #[test]
    fn test_outcome_derivation() {
        assert_eq!(Outcome::from_issues(&[]), Outcome::Pass);
        assert_eq!(
            Outcome::from_issues(&[issue(Severity::Minor), issue(Severity::Major)]),
            Outcome::PassWithIssues
        );
        assert_eq!(
            Outcome::from_issues(&[issue(Severity::Minor), issue(Severity::Critical)]),
            Outcome::Fail
        );
    }

    #[test]
    fn test_pass_rate_rounds_half_up() {
        assert_eq!(report(23, 24).pass_rate(), Some(96));
        assert_eq!(report(1, 8).pass_rate(), Some(13)); // 12.5
        assert_eq!(report(1, 3).pass_rate(), Some(33));
        assert_eq!(report(2, 3).pass_rate(), Some(67));
        assert_eq!(report(0, 0).pass_rate(), None);
        assert_eq!(report(23, 24).pass_rate_line(), "23/24 checks passed (96%)");
        assert_eq!(report(0, 0).pass_rate_line(), "0/0 checks passed (n/a)");
    }

    #[test]
    fn test_not_applicable_is_not_a_failure() {
        let na = CheckResult::not_applicable("continuity.learnings", "no previous story");
        assert!(!na.passed);
        assert!(!na.is_failure());
        assert_eq!(na.message, "not applicable: no previous story");
    }

    #[test]
    fn test_severity_max() {
        assert_eq!(Severity::Minor.max(Severity::Critical), Severity::Critical);
        assert_eq!(Severity::Major.max(Severity::Minor), Severity::Major);
    }
}
