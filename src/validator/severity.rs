//! Turns failed check results into report issues

use crate::models::{CheckResult, Issue, Severity};
use crate::validator::rules::Rule;
use std::collections::HashMap;

fn rule_severity(rule_id: &str) -> Severity {
    match Rule::from_id(rule_id) {
        Some(rule) => rule.severity(),
        None => {
            tracing::warn!(rule = rule_id, "unknown rule id, classifying as major");
            Severity::Major
        }
    }
}

/// Classify failed results into issues
///
/// Each finding becomes an issue carrying its rule's severity. Findings that
/// share a root-cause key collapse into the first such issue, which keeps
/// the highest severity and gains the other rule ids. Not-applicable results
/// produce nothing.
pub fn classify(results: &[CheckResult]) -> Vec<Issue> {
    let mut issues: Vec<Issue> = Vec::new();
    let mut by_root: HashMap<String, usize> = HashMap::new();

    for result in results.iter().filter(|r| r.is_failure()) {
        let severity = rule_severity(&result.rule_id);

        if result.findings.is_empty() {
            issues.push(Issue {
                severity,
                rule_ids: vec![result.rule_id.clone()],
                description: result.message.clone(),
                recommendation: String::new(),
                evidence: result.evidence.clone(),
            });
            continue;
        }

        for finding in &result.findings {
            let evidence: Vec<String> = finding.evidence.iter().cloned().collect();

            if let Some(&idx) = finding.root_cause.as_ref().and_then(|k| by_root.get(k)) {
                let issue = &mut issues[idx];
                issue.severity = issue.severity.max(severity);
                if !issue.rule_ids.contains(&result.rule_id) {
                    issue.rule_ids.push(result.rule_id.clone());
                }
                for line in evidence {
                    if !issue.evidence.contains(&line) {
                        issue.evidence.push(line);
                    }
                }
                continue;
            }

            if let Some(key) = &finding.root_cause {
                by_root.insert(key.clone(), issues.len());
            }
            issues.push(Issue {
                severity,
                rule_ids: vec![result.rule_id.clone()],
                description: finding.description.clone(),
                recommendation: finding.recommendation.clone(),
                evidence,
            });
        }
    }

    issues
}
