use crate::models::{CheckResult, DocumentModel};
use crate::validator::rules::{Rule, RuleContext, Scratch};

/// Runs checklist rules in a fixed order
///
/// Rules never run in parallel: `ac.present` fills the scratch criteria
/// count that later criteria and task rules read.
#[derive(Debug, Clone)]
pub struct ChecklistEngine {
    rules: Vec<Rule>,
}

impl Default for ChecklistEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChecklistEngine {
    /// Engine with the full catalogue
    pub fn new() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
        }
    }

    /// Engine with a subset of rules, kept in the order given
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate every rule against the model
    pub fn run(&self, model: &DocumentModel, ctx: &RuleContext<'_>) -> Vec<CheckResult> {
        let mut scratch = Scratch::default();
        let mut results = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let result = rule.evaluate(model, ctx, &scratch);

            if *rule == Rule::CriteriaPresent {
                scratch.criteria_count = Some(model.acceptance_criteria.len());
            }

            if !result.applicable {
                tracing::debug!(rule = rule.id(), reason = %result.message, "rule skipped");
            } else if !result.passed {
                tracing::debug!(rule = rule.id(), findings = result.findings.len(), "rule failed");
            }
            results.push(result);
        }

        tracing::info!(
            path = %model.path,
            rules = results.len(),
            passed = results.iter().filter(|r| r.passed).count(),
            "checklist complete"
        );
        results
    }
}
