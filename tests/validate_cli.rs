//! CLI tests: exit codes, output formats and batch mode

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn storycheck(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("storycheck").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    dir
}

#[test]
fn test_validate_passing_story_exits_zero() {
    let dir = project();
    storycheck(&dir)
        .args([
            "validate",
            "stories/1-2-user-login.md",
            "--previous",
            "stories/1-1-setup.md",
            "--tech-spec",
            "docs/tech-spec-epic-1.md",
            "--docs-dir",
            "docs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Story Quality Validation Report"))
        .stdout(predicate::str::contains("**Outcome:** ✅ PASS"))
        .stdout(predicate::str::contains("20/20 checks passed (100%)"));
}

#[test]
fn test_absolute_tech_spec_with_relative_docs_dir() {
    let dir = project();
    let spec = dir.path().join("docs/tech-spec-epic-1.md");
    storycheck(&dir)
        .args(["validate", "stories/1-2-user-login.md", "--previous", "stories/1-1-setup.md"])
        .arg("--tech-spec")
        .arg(&spec)
        .args(["--docs-dir", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**Outcome:** ✅ PASS"))
        .stdout(predicate::str::contains("20/20 checks passed (100%)"))
        .stdout(predicate::str::contains("is not cited").not());
}

#[test]
fn test_validate_failing_story_exits_one() {
    let dir = project();
    fs::write(dir.path().join("stories/1-3-reset.md"), STORY_WITHOUT_CRITERIA).unwrap();
    storycheck(&dir)
        .args([
            "validate",
            "stories/1-3-reset.md",
            "--tech-spec",
            "docs/tech-spec-epic-1.md",
            "--docs-dir",
            "docs",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("**FAIL**"))
        .stdout(predicate::str::contains("Tech spec AC2 has no matching story criterion"));
}

#[test]
fn test_validate_non_story_exits_two() {
    let dir = project();
    fs::write(dir.path().join("notes.md"), NOTES).unwrap();
    storycheck(&dir)
        .args(["validate", "notes.md"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a story document"));
}

#[test]
fn test_validate_missing_file_exits_two() {
    let dir = project();
    storycheck(&dir)
        .args(["validate", "stories/9-9-missing.md"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let dir = project();
    storycheck(&dir)
        .args(["validate", "stories/1-2-user-login.md", "--bogus"])
        .assert()
        .code(2);
}

#[test]
fn test_json_report_marks_unresolved_citations() {
    let dir = project();
    let output = storycheck(&dir)
        .args(["validate", "stories/1-2-user-login.md", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"], "pass_with_issues");
    let missing: Vec<_> = report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| {
            i["description"]
                .as_str()
                .unwrap()
                .starts_with("citation target missing")
        })
        .collect();
    // without --docs-dir or --previous only the story itself is known
    assert_eq!(missing.len(), 3);
    assert!(missing.iter().all(|i| i["severity"] == "major"));
    assert!(report["citations"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["target_path"] == "docs/tech-spec-epic-1.md")
        .all(|c| c["resolved"] == false));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let dir = project();
    let args = [
        "validate",
        "stories/1-2-user-login.md",
        "--previous",
        "stories/1-1-setup.md",
        "--docs-dir",
        "docs",
    ];
    let first = storycheck(&dir).args(args).output().unwrap();
    let second = storycheck(&dir).args(args).output().unwrap();
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_validate_writes_output_file() {
    let dir = project();
    storycheck(&dir)
        .args([
            "validate",
            "stories/1-2-user-login.md",
            "--docs-dir",
            "docs",
            "--output",
            "report.md",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report: report.md"));

    let saved = fs::read_to_string(dir.path().join("report.md")).unwrap();
    assert!(saved.contains("## Validation Outcome"));
}

#[test]
fn test_batch_writes_one_report_per_story() {
    let dir = project();
    fs::write(dir.path().join("stories/README.md"), NOTES).unwrap();

    storycheck(&dir)
        .args([
            "batch",
            "stories",
            "--docs-dir",
            "docs",
            "--format",
            "json",
            "--output-dir",
            "reports",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped"))
        .stdout(predicate::str::contains("Validated 2 story file(s), skipped 1"));

    let login = fs::read_to_string(dir.path().join("reports/1-2-user-login-validation.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&login).unwrap();
    // 1-1 precedes 1-2, so continuity checks ran
    let skipped: Vec<_> = report["not_applicable"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["rule_id"].as_str().unwrap().to_string())
        .collect();
    assert!(!skipped.iter().any(|id| id.starts_with("continuity.")));
    assert!(dir.path().join("reports/1-1-setup-validation.json").exists());
    assert!(!dir.path().join("reports/README-validation.json").exists());
}

#[test]
fn test_rules_lists_catalogue() {
    let dir = project();
    storycheck(&dir)
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("metadata.title"))
        .stdout(predicate::str::contains("structure.duplicate-sections"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = project();
    fs::write(
        dir.path().join("storycheck.toml"),
        "allowed_statuses = [\"ready-for-dev\"]\n",
    )
    .unwrap();
    storycheck(&dir)
        .args(["validate", "stories/1-2-user-login.md", "--docs-dir", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status 'drafted' is not an allowed value"));
}
