use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A heading-delimited block of a markdown document
///
/// Spans from the heading line up to the line before the next heading of
/// the same or a higher level, so a `##` section contains its `###` children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text as written (without `#` markers)
    pub name: String,
    /// Heading level (1-6)
    pub level: u8,
    /// Line of the heading (1-indexed)
    pub start_line: usize,
    /// Last line belonging to the section (1-indexed, inclusive)
    pub end_line: usize,
    /// Body text below the heading
    pub raw_text: String,
}

impl Section {
    /// Body lines paired with their 1-indexed line numbers
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        let first = self.start_line + 1;
        self.raw_text
            .lines()
            .enumerate()
            .map(move |(idx, line)| (first + idx, line))
    }

    /// Whether a line number falls inside the section
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// A reference from the document to a location in another document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Path as written in the citation
    pub target_path: String,
    /// Section or anchor inside the target
    pub section: Option<String>,
    /// Inclusive line range inside the target
    pub line_range: Option<(usize, usize)>,
    /// Line of the citing document where the citation occurs (1-indexed)
    pub line: usize,
    /// Whether the target was found among the known documents
    pub resolved: bool,
    /// Known path the target resolved to
    pub resolved_path: Option<String>,
}

impl Citation {
    /// Create an unresolved citation
    pub fn new(target_path: impl Into<String>, line: usize) -> Self {
        Self {
            target_path: target_path.into(),
            section: None,
            line_range: None,
            line,
            resolved: false,
            resolved_path: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_lines(mut self, start: usize, end: usize) -> Self {
        self.line_range = Some((start, end));
        self
    }

    /// Whether this citation points at the given known path
    pub fn references(&self, known_path: &str) -> bool {
        self.resolved_path.as_deref() == Some(known_path)
    }
}

impl fmt::Display for Citation {
    /// Serializes in the bracketed `[Source: path#Section, lines X-Y]` form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Source: {}", self.target_path)?;
        if let Some(section) = &self.section {
            write!(f, "#{}", section)?;
        }
        match self.line_range {
            Some((start, end)) if start == end => write!(f, ", line {}", start)?,
            Some((start, end)) => write!(f, ", lines {}-{}", start, end)?,
            None => {}
        }
        write!(f, "]")
    }
}

/// An acceptance criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Normalized id (`AC1`, `AC2.1`, ...)
    pub id: String,
    /// Criterion text on its first line, citations stripped
    pub title: String,
    /// Given/When/Then text when the criterion is written that way
    pub given_when_then: Option<String>,
    /// First citation appearing inside the criterion
    pub source_citation: Option<Citation>,
    /// Full criterion text including continuation lines
    pub body: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// A checkbox item nested under a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    pub completed: bool,
    pub line: usize,
}

/// A top-level checkbox item of the tasks section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// `Task N` when the title is numbered, otherwise `T<position>`
    pub id: String,
    pub title: String,
    /// Criterion ids mentioned by the task or its subtasks
    pub referenced_criteria_ids: BTreeSet<String>,
    /// Any subtask is about testing
    pub has_testing_subtask: bool,
    /// The task itself is about testing
    pub is_testing_task: bool,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
    pub line: usize,
}

/// A follow-up item recorded in a review or action-items section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub text: String,
    pub resolved: bool,
    pub line: usize,
}

/// Non-fatal observation made while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseWarning {
    /// The same heading appeared more than once; the later one was kept
    DuplicateSection {
        name: String,
        first_line: usize,
        line: usize,
    },
    /// A criterion id appeared more than once; the later one was dropped
    DuplicateCriterion { id: String, line: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::DuplicateSection {
                name,
                first_line,
                line,
            } => write!(
                f,
                "Section '{}' at line {} duplicates line {}",
                name, line, first_line
            ),
            ParseWarning::DuplicateCriterion { id, line } => {
                write!(f, "Criterion {} at line {} is a duplicate", id, line)
            }
        }
    }
}

/// Structured view of a story (or reference) document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentModel {
    /// Normalized path of the source file
    pub path: String,
    /// First H1 heading or frontmatter `title`
    pub title: Option<String>,
    /// `1.2` from a `Story 1.2: ...` title
    pub story_key: Option<String>,
    pub status: Option<String>,
    /// Sections keyed by heading text, in order of first appearance
    pub sections: IndexMap<String, Section>,
    pub acceptance_criteria: Vec<Criterion>,
    pub tasks: Vec<Task>,
    pub citations: Vec<Citation>,
    pub action_items: Vec<ActionItem>,
    pub warnings: Vec<ParseWarning>,
    /// `sha256:<hex>` of the normalized document text
    pub checksum: String,
}

impl DocumentModel {
    /// Look up a section by name, ignoring case and surrounding whitespace
    pub fn section(&self, name: &str) -> Option<&Section> {
        let wanted = name.trim();
        self.sections
            .values()
            .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
    }

    /// First section whose name starts with the given prefix (case-insensitive)
    pub fn section_starting_with(&self, prefix: &str) -> Option<&Section> {
        let prefix = prefix.trim().to_lowercase();
        self.sections
            .values()
            .find(|s| s.name.trim().to_lowercase().starts_with(&prefix))
    }

    /// First section whose name contains the given text (case-insensitive)
    pub fn section_containing(&self, needle: &str) -> Option<&Section> {
        let needle = needle.trim().to_lowercase();
        self.sections
            .values()
            .find(|s| s.name.to_lowercase().contains(&needle))
    }

    /// Citations located inside a section
    pub fn citations_in<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = &'a Citation> {
        self.citations
            .iter()
            .filter(move |c| section.contains_line(c.line))
    }

    /// Action items that are still open
    pub fn unresolved_action_items(&self) -> impl Iterator<Item = &ActionItem> {
        self.action_items.iter().filter(|item| !item.resolved)
    }

    /// Display name used in reports
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, start: usize, end: usize, raw: &str) -> Section {
        Section {
            name: name.to_string(),
            level: 2,
            start_line: start,
            end_line: end,
            raw_text: raw.to_string(),
        }
    }

    #[test]
    fn test_citation_display_forms() {
        let full = Citation::new("docs/x.md", 3)
            .with_section("Sec")
            .with_lines(10, 20);
        assert_eq!(full.to_string(), "[Source: docs/x.md#Sec, lines 10-20]");

        let single = Citation::new("docs/x.md", 3).with_lines(7, 7);
        assert_eq!(single.to_string(), "[Source: docs/x.md, line 7]");

        let bare = Citation::new("docs/x.md", 3);
        assert_eq!(bare.to_string(), "[Source: docs/x.md]");
    }

    #[test]
    fn test_section_numbered_lines() {
        let s = section("Story", 4, 6, "As a user\nI want x");
        let lines: Vec<_> = s.numbered_lines().collect();
        assert_eq!(lines, vec![(5, "As a user"), (6, "I want x")]);
        assert!(s.contains_line(4));
        assert!(!s.contains_line(7));
    }

    #[test]
    fn test_section_lookup_is_case_insensitive() {
        let mut sections = IndexMap::new();
        sections.insert(
            "Tasks / Subtasks".to_string(),
            section("Tasks / Subtasks", 1, 2, "- [ ] Task 1"),
        );
        let model = DocumentModel {
            path: "s.md".to_string(),
            title: None,
            story_key: None,
            status: None,
            sections,
            acceptance_criteria: vec![],
            tasks: vec![],
            citations: vec![],
            action_items: vec![],
            warnings: vec![],
            checksum: String::new(),
        };
        assert!(model.section("tasks / subtasks").is_some());
        assert!(model.section_starting_with("Tasks").is_some());
        assert!(model.section_containing("subtask").is_some());
        assert_eq!(model.display_name(), "s.md");
    }
}
