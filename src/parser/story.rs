//! Story document parser
//!
//! Builds a [`DocumentModel`] from markdown: sections, acceptance criteria,
//! tasks, action items and citations. Citation resolution is a separate step
//! (see [`crate::parser::resolve_citations`]) because it needs the set of
//! known documents.

use crate::error::ParseError;
use crate::models::{
    ActionItem, Citation, Criterion, DocumentModel, ParseWarning, Section, Subtask, Task,
};
use crate::parser::citation::extract_citations;
use crate::parser::frontmatter::{
    calculate_checksum, normalize_content, parse_story_frontmatter, split_frontmatter,
    StoryFrontmatter,
};
use crate::parser::markdown::split_sections;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

const STORY_SECTION: &str = "Story";
const ACCEPTANCE_CRITERIA: &str = "Acceptance Criteria";
const TASKS_PREFIX: &str = "Tasks";
const ACTION_ITEM_MARKERS: [&str; 3] = ["action item", "review follow-up", "follow-ups"];

static STATUS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*|__)?status(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.+?)\s*$")
        .expect("valid status regex")
});

static STORY_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bstory\s+(\d+(?:[.\-]\d+)*)").expect("valid story key regex")
});

static AC_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s{0,3}(?:#{1,6}\s+)?(?:[-*+]\s+)?(?:\d+[.)]\s+)?(?:\*\*|__)?AC[-\s#]?(\d+(?:\.\d+)*)(?:\*\*|__)?\s*[:.)\-–]?\s*(?:\*\*|__)?\s*(.*)$",
    )
    .expect("valid criterion label regex")
});

static AC_NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(\d+)[.)]\s+(.*)$").expect("valid numbered regex"));

static HEADING_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}\s").expect("valid heading regex"));

static GWT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(given|when)\b.*\bthen\b").expect("valid given/when/then regex")
});

static SOURCE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[source:[^\]]*\]").expect("valid source text regex"));

static CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)[-*+]\s+\[([ xX])\]\s+(.*)$").expect("valid checkbox regex")
});

static TASK_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*|__)?task\s+(\d+(?:\.\d+)*)").expect("valid task id regex")
});

static AC_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bACs?[-:\s#]*(#?\d+(?:\.\d+)*(?:\s*(?:,|&|/|and)\s*#?\d+(?:\.\d+)*)*)")
        .expect("valid AC ref regex")
});

static CRITERION_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid criterion number regex"));

static TESTING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btest").expect("valid testing regex"));

/// Parse a story document
///
/// Fails with [`ParseError::NotAStory`] when either the Story section (or a
/// `Story ...` title) or the Acceptance Criteria section is missing.
pub fn parse_story(text: &str, path: &str) -> Result<DocumentModel, ParseError> {
    let model = build_model(text, path)?;

    let mut missing = Vec::new();
    let titled_story = model
        .title
        .as_deref()
        .map_or(false, |t| t.trim().to_lowercase().starts_with("story"));
    if model.section(STORY_SECTION).is_none() && !titled_story {
        missing.push(STORY_SECTION.to_string());
    }
    if model.section_starting_with(ACCEPTANCE_CRITERIA).is_none() {
        missing.push(ACCEPTANCE_CRITERIA.to_string());
    }
    if !missing.is_empty() {
        return Err(ParseError::NotAStory {
            path: model.path,
            missing,
        });
    }

    tracing::debug!(
        path = %model.path,
        sections = model.sections.len(),
        criteria = model.acceptance_criteria.len(),
        tasks = model.tasks.len(),
        citations = model.citations.len(),
        "parsed story"
    );
    Ok(model)
}

/// Parse a reference document such as a tech spec
///
/// No sections are required; criteria come from any section whose heading
/// starts with "Acceptance Criteria".
pub fn parse_reference(text: &str, path: &str) -> Result<DocumentModel, ParseError> {
    let model = build_model(text, path)?;
    tracing::debug!(path = %model.path, criteria = model.acceptance_criteria.len(), "parsed reference document");
    Ok(model)
}

fn build_model(text: &str, path: &str) -> Result<DocumentModel, ParseError> {
    let path = crate::parser::normalize_path(path);
    let normalized = normalize_content(text);
    let checksum = calculate_checksum(&normalized);

    let (frontmatter, body, offset) = match split_frontmatter(&normalized) {
        Ok(Some(split)) => (
            parse_story_frontmatter(&split.raw, &path)?,
            split.body,
            split.body_line_offset,
        ),
        Ok(None) => (StoryFrontmatter::default(), normalized.clone(), 0),
        Err(message) => return Err(ParseError::Frontmatter { path, message }),
    };

    let mut warnings = Vec::new();
    let sections = index_sections(split_sections(&body, offset), &mut warnings);

    let title = frontmatter.title.clone().or_else(|| {
        sections
            .values()
            .find(|s| s.level == 1)
            .map(|s| s.name.clone())
    });
    let story_key = title
        .as_deref()
        .and_then(|t| STORY_KEY_RE.captures(t))
        .map(|caps| caps[1].replace('-', "."));
    let status = frontmatter
        .status
        .clone()
        .or_else(|| status_from_body(&body, &sections));

    let citations = extract_citations(&body, offset);

    let acceptance_criteria = sections
        .values()
        .find(|s| s.name.to_lowercase().starts_with(&ACCEPTANCE_CRITERIA.to_lowercase()))
        .map(|s| parse_criteria(s, &citations, &mut warnings))
        .unwrap_or_default();

    let tasks = sections
        .values()
        .find(|s| s.name.to_lowercase().starts_with(&TASKS_PREFIX.to_lowercase()))
        .map(parse_tasks)
        .unwrap_or_default();

    let action_items = parse_action_items(&sections);

    Ok(DocumentModel {
        path,
        title,
        story_key,
        status,
        sections,
        acceptance_criteria,
        tasks,
        citations,
        action_items,
        warnings,
        checksum,
    })
}

/// Key sections by heading; a repeated heading replaces the earlier one
fn index_sections(
    sections: Vec<Section>,
    warnings: &mut Vec<ParseWarning>,
) -> IndexMap<String, Section> {
    let mut map: IndexMap<String, Section> = IndexMap::new();
    for section in sections {
        if section.name.is_empty() {
            continue;
        }
        if let Some(previous) = map.get(&section.name) {
            tracing::warn!(section = %section.name, line = section.start_line, "duplicate section heading");
            warnings.push(ParseWarning::DuplicateSection {
                name: section.name.clone(),
                first_line: previous.start_line,
                line: section.start_line,
            });
        }
        map.insert(section.name.clone(), section);
    }
    map
}

fn status_from_body(body: &str, sections: &IndexMap<String, Section>) -> Option<String> {
    let mut in_fence = false;
    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = STATUS_LINE_RE.captures(line) {
            let value = caps[1].trim_matches(|c| c == '*' || c == '_').trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    sections
        .values()
        .find(|s| s.name.eq_ignore_ascii_case("status"))
        .and_then(|s| s.raw_text.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(str::to_string)
}

// =============================================================================
// Acceptance Criteria
// =============================================================================

struct CriterionBuilder {
    id: String,
    title: String,
    body: Vec<String>,
    start_line: usize,
    end_line: usize,
}

impl CriterionBuilder {
    fn finish(self, citations: &[Citation]) -> Criterion {
        let title = clean_title(&self.title);
        let body = self.body.join("\n");
        let flattened = flatten(&body);
        let given_when_then = GWT_RE.find(&flattened).map(|m| {
            flattened[m.start()..].trim().to_string()
        });
        let source_citation = citations
            .iter()
            .find(|c| c.line >= self.start_line && c.line <= self.end_line)
            .cloned();

        Criterion {
            id: self.id,
            title,
            given_when_then,
            source_citation,
            body,
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }
}

/// `AC` plus the number with leading zeros dropped per component (`02.10` -> `AC2.10`)
fn criterion_id(number: &str) -> String {
    let parts: Vec<&str> = number
        .split('.')
        .map(|part| match part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        })
        .collect();
    format!("AC{}", parts.join("."))
}

fn clean_title(raw: &str) -> String {
    let without_sources = SOURCE_TEXT_RE.replace_all(raw, "");
    without_sources
        .trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .to_string()
}

/// Collapse whitespace and strip list markers so keyword matching sees prose
fn flatten(text: &str) -> String {
    text.lines()
        .map(|l| {
            l.trim()
                .trim_start_matches(|c| c == '-' || c == '*' || c == '+')
                .trim()
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_criteria(
    section: &Section,
    citations: &[Citation],
    warnings: &mut Vec<ParseWarning>,
) -> Vec<Criterion> {
    let mut builders: Vec<CriterionBuilder> = Vec::new();
    let mut current: Option<CriterionBuilder> = None;

    for (line_no, line) in section.numbered_lines() {
        let start = AC_LABEL_RE
            .captures(line)
            .or_else(|| AC_NUMBERED_RE.captures(line))
            .map(|caps| (criterion_id(&caps[1]), caps[2].to_string()));

        if let Some((id, title)) = start {
            builders.extend(current.take());
            current = Some(CriterionBuilder {
                id,
                body: vec![title.clone()],
                title,
                start_line: line_no,
                end_line: line_no,
            });
            continue;
        }

        if HEADING_LINE_RE.is_match(line) {
            builders.extend(current.take());
            continue;
        }

        if let Some(builder) = current.as_mut() {
            if !line.trim().is_empty() {
                builder.body.push(line.to_string());
                builder.end_line = line_no;
            }
        }
    }
    builders.extend(current);

    let mut seen = BTreeSet::new();
    let mut criteria = Vec::new();
    for builder in builders {
        if !seen.insert(builder.id.clone()) {
            warnings.push(ParseWarning::DuplicateCriterion {
                id: builder.id.clone(),
                line: builder.start_line,
            });
            continue;
        }
        criteria.push(builder.finish(citations));
    }
    criteria
}

// =============================================================================
// Tasks
// =============================================================================

fn indent_width(prefix: &str) -> usize {
    prefix
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Criterion ids (`AC<n>`) mentioned in a piece of text
pub fn referenced_criteria(text: &str) -> BTreeSet<String> {
    AC_REF_RE
        .captures_iter(text)
        .flat_map(|caps| {
            CRITERION_NUMBER_RE
                .find_iter(&caps[1])
                .map(|m| criterion_id(m.as_str()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn parse_tasks(section: &Section) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();

    for (line_no, line) in section.numbered_lines() {
        let Some(caps) = CHECKBOX_RE.captures(line) else {
            continue;
        };
        let indent = indent_width(&caps[1]);
        let completed = &caps[2] != " ";
        let title = caps[3].trim().to_string();

        match tasks.last_mut() {
            Some(task) if indent >= 2 => {
                task.referenced_criteria_ids.extend(referenced_criteria(&title));
                if TESTING_RE.is_match(&title) {
                    task.has_testing_subtask = true;
                }
                task.subtasks.push(Subtask {
                    title,
                    completed,
                    line: line_no,
                });
            }
            _ => {
                let id = TASK_ID_RE
                    .captures(&title)
                    .map(|c| format!("Task {}", &c[1]))
                    .unwrap_or_else(|| format!("T{}", tasks.len() + 1));
                tasks.push(Task {
                    id,
                    referenced_criteria_ids: referenced_criteria(&title),
                    has_testing_subtask: false,
                    is_testing_task: TESTING_RE.is_match(&title),
                    title,
                    completed,
                    subtasks: Vec::new(),
                    line: line_no,
                });
            }
        }
    }

    tasks
}

fn parse_action_items(sections: &IndexMap<String, Section>) -> Vec<ActionItem> {
    // keyed by line so nested matching sections do not double count
    let mut items: BTreeMap<usize, ActionItem> = BTreeMap::new();

    for section in sections.values() {
        let name = section.name.to_lowercase();
        if !ACTION_ITEM_MARKERS.iter().any(|m| name.contains(m)) {
            continue;
        }
        for (line_no, line) in section.numbered_lines() {
            if let Some(caps) = CHECKBOX_RE.captures(line) {
                items.entry(line_no).or_insert_with(|| ActionItem {
                    text: caps[3].trim().to_string(),
                    resolved: &caps[2] != " ",
                    line: line_no,
                });
            }
        }
    }

    items.into_values().collect()
}
