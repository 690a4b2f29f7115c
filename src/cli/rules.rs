//! Rules command: print the checklist in execution order

use crate::models::Severity;
use crate::validator::{ChecklistEngine, RuleCategory};
use colored::Colorize;

pub fn run() {
    let engine = ChecklistEngine::new();
    let mut category: Option<RuleCategory> = None;

    println!("{}", "📋 Story checklist".cyan().bold());
    for (idx, rule) in engine.rules().iter().enumerate() {
        if category != Some(rule.category()) {
            category = Some(rule.category());
            println!("\n{}", rule.category().name().green().bold());
        }

        let severity = match rule.severity() {
            Severity::Critical => rule.severity().name().red(),
            Severity::Major => rule.severity().name().yellow(),
            Severity::Minor => rule.severity().name().blue(),
        };
        println!(
            "  {:>2}. {:<30} {:<8} {}",
            idx + 1,
            rule.id(),
            severity,
            rule.description()
        );
        if let Some(needs) = rule.needs() {
            println!("      {}", format!("needs: {}", needs).bright_black());
        }
    }
}
