//! Integration tests for the validation pipeline
//!
//! Covers the full parse -> resolve -> check -> classify -> render flow:
//! - complete stories passing every applicable check
//! - continuity checks excluded when no previous story is given
//! - tech spec coverage and unresolved citations
//! - byte-identical output across runs

mod common;

use common::*;
use storycheck::models::{Outcome, Severity};
use storycheck::parser::{parse_citation, parse_reference, parse_story, PathIndex};
use storycheck::report::{render, render_markdown, ReportFormat};
use storycheck::{ValidatorConfig, Validator};

fn known_docs() -> PathIndex {
    PathIndex::new([
        "docs/tech-spec-epic-1.md",
        "docs/architecture.md",
        "stories/1-1-setup.md",
    ])
}

fn validator() -> Validator {
    Validator::new(ValidatorConfig::default()).unwrap()
}

#[test]
fn test_complete_story_passes_with_full_context() {
    let previous = parse_story(PREVIOUS_STORY, "stories/1-1-setup.md").unwrap();
    let spec = parse_reference(TECH_SPEC, "docs/tech-spec-epic-1.md").unwrap();

    let report = validator()
        .validate_text(
            STORY,
            "stories/1-2-user-login.md",
            Some(&previous),
            Some(&spec),
            &known_docs(),
        )
        .unwrap();

    assert!(report.issues.is_empty(), "unexpected issues: {:#?}", report.issues);
    assert_eq!(report.outcome, Outcome::Pass);
    assert!(report.not_applicable.is_empty());
    assert_eq!(report.pass_rate_line(), "20/20 checks passed (100%)");
    assert_eq!(report.story_key.as_deref(), Some("1.2"));
}

#[test]
fn test_continuity_not_applicable_without_previous() {
    let report = validator()
        .validate_text(STORY, "stories/1-2-user-login.md", None, None, &known_docs())
        .unwrap();

    let skipped: Vec<_> = report.not_applicable.iter().map(|s| s.rule_id.as_str()).collect();
    assert!(skipped.contains(&"continuity.learnings"));
    assert!(skipped.contains(&"continuity.action-items"));
    assert!(report
        .successes
        .iter()
        .all(|s| !s.rule_id.starts_with("continuity.")));
    assert_eq!(report.total_checks, 15);
    assert_eq!(report.outcome, Outcome::Pass);
}

#[test]
fn test_missing_criteria_against_tech_spec_fails() {
    let spec = parse_reference(TECH_SPEC, "docs/tech-spec-epic-1.md").unwrap();
    let report = validator()
        .validate_text(
            STORY_WITHOUT_CRITERIA,
            "stories/1-3-reset.md",
            None,
            Some(&spec),
            &known_docs(),
        )
        .unwrap();

    let uncovered: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.rule_ids.iter().any(|id| id == "ac.tech-spec-coverage"))
        .collect();
    assert_eq!(uncovered.len(), 2);
    assert!(uncovered.iter().all(|i| i.severity == Severity::Critical));
    assert_eq!(report.outcome, Outcome::Fail);
    assert_eq!(report.outcome.exit_code(), 1);
}

#[test]
fn test_unresolved_tech_spec_citation_is_one_major_issue() {
    let index = PathIndex::new(["docs/architecture.md", "stories/1-1-setup.md"]);
    let report = validator()
        .validate_text(STORY, "stories/1-2-user-login.md", None, None, &index)
        .unwrap();

    let missing: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.description.contains("citation target missing"))
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].severity, Severity::Major);
    // both criteria cite the same missing file
    assert_eq!(missing[0].evidence.len(), 2);

    let spec_citations: Vec<_> = report
        .citations
        .iter()
        .filter(|c| c.target_path == "docs/tech-spec-epic-1.md")
        .collect();
    assert_eq!(spec_citations.len(), 2);
    assert!(spec_citations.iter().all(|c| !c.resolved));
}

#[test]
fn test_uncited_tech_spec_merges_into_one_critical_issue() {
    let text = STORY
        .replace(" [Source: docs/tech-spec-epic-1.md#AC1]", "")
        .replace(" [Source: docs/tech-spec-epic-1.md#AC2]", "");
    let spec = parse_reference(TECH_SPEC, "docs/tech-spec-epic-1.md").unwrap();
    let report = validator()
        .validate_text(&text, "stories/1-2-user-login.md", None, Some(&spec), &known_docs())
        .unwrap();

    let uncited: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.description.contains("docs/tech-spec-epic-1.md is not cited"))
        .collect();
    assert_eq!(uncited.len(), 1);
    assert_eq!(uncited[0].severity, Severity::Critical);
    assert_eq!(
        uncited[0].rule_ids,
        vec!["sources.tech-spec-cited".to_string(), "sources.coverage".to_string()]
    );
}

#[test]
fn test_dotted_criteria_and_multi_target_sources() {
    let spec = parse_reference(DRAFTS_TECH_SPEC, "docs/tech-spec-epic-2.md").unwrap();
    let index = PathIndex::new(["docs/tech-spec-epic-2.md", "docs/epics.md", "docs/architecture.md"]);
    let report = validator()
        .validate_text(DRAFTS_STORY, "stories/2-1-save-drafts.md", None, Some(&spec), &index)
        .unwrap();

    // epics.md is the second target of one bracket and still counts as cited
    assert!(report.successes.iter().any(|s| s.rule_id == "sources.coverage"));
    let epics: Vec<_> = report
        .citations
        .iter()
        .filter(|c| c.target_path == "docs/epics.md")
        .collect();
    assert_eq!(epics.len(), 1);
    assert!(epics[0].resolved);

    // every dotted tech spec criterion is checked on its own
    assert_eq!(report.issues.len(), 1, "{:#?}", report.issues);
    let issue = &report.issues[0];
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.rule_ids, vec!["ac.tech-spec-coverage".to_string()]);
    assert!(issue.description.starts_with("Tech spec AC2.3 has no matching story criterion"));
    assert_eq!(report.outcome, Outcome::Fail);
    assert_eq!(report.pass_rate_line(), "17/18 checks passed (94%)");
}

#[test]
fn test_same_input_gives_identical_reports() {
    let run = || {
        validator()
            .validate_text(STORY, "stories/1-2-user-login.md", None, None, &known_docs())
            .unwrap()
    };
    let (first, second) = (run(), run());
    assert_eq!(first, second);
    assert_eq!(render_markdown(&first), render_markdown(&second));
    assert_eq!(
        render(&first, ReportFormat::Json).unwrap(),
        render(&second, ReportFormat::Json).unwrap()
    );
}

#[test]
fn test_citation_round_trip() {
    let text = "[Source: docs/x.md#Sec, lines 10-20]";
    let citation = parse_citation(text).unwrap();
    assert_eq!(citation.target_path, "docs/x.md");
    assert_eq!(citation.section.as_deref(), Some("Sec"));
    assert_eq!(citation.line_range, Some((10, 20)));
    assert_eq!(citation.to_string(), text);
}
