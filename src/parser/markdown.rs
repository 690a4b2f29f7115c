//! Heading-based section splitting (AST-based)
//!
//! Uses pulldown-cmark offsets so headings inside code fences are ignored and
//! setext headings are handled the same way as ATX ones.

use crate::models::Section;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A heading found in a markdown body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Line of the heading (1-indexed, relative to the parsed text)
    pub line: usize,
    /// Last line occupied by the heading markup (differs for setext headings)
    pub last_line: usize,
}

/// Maps byte offsets to 1-indexed line numbers
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    /// Line containing the byte at `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Collect all headings with their line positions
pub fn collect_headings(text: &str) -> Vec<Heading> {
    let index = LineIndex::new(text);
    let parser = Parser::new_ext(text, Options::all()).into_offset_iter();

    let mut headings = Vec::new();
    let mut current: Option<(u8, usize, String)> = None;

    for (event, range) in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((level_number(level), index.line_of(range.start), String::new()));
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, _, ref mut buf)) = current {
                    buf.push_str(&t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, line, buf)) = current.take() {
                    let last_line = index.line_of(range.end.saturating_sub(1)).max(line);
                    headings.push(Heading {
                        level,
                        text: buf.trim().to_string(),
                        line,
                        last_line,
                    });
                }
            }
            _ => {}
        }
    }

    headings
}

/// Split text into sections, one per heading, in document order
///
/// `line_offset` is added to every line number so positions refer to the
/// original file when the text is a body following frontmatter.
pub fn split_sections(text: &str, line_offset: usize) -> Vec<Section> {
    let lines: Vec<&str> = text.lines().collect();
    let headings = collect_headings(text);
    let mut sections = Vec::with_capacity(headings.len());

    for (idx, heading) in headings.iter().enumerate() {
        let end_line = headings[idx + 1..]
            .iter()
            .find(|h| h.level <= heading.level)
            .map(|h| h.line - 1)
            .unwrap_or(lines.len())
            .max(heading.last_line);

        let body_start = heading.last_line; // 0-indexed line after the heading
        let raw_text = lines
            .get(body_start..end_line)
            .map(|body| body.join("\n"))
            .unwrap_or_default();

        sections.push(Section {
            name: heading.text.clone(),
            level: heading.level,
            start_line: heading.line + line_offset,
            end_line: end_line + line_offset,
            raw_text,
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbb\n\nc");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }

    #[test]
    fn test_collect_headings_ignores_code_fences() {
        let text = "# Title\n\n```\n# not a heading\n```\n\n## Story\n";
        let headings = collect_headings(text);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].text, "Title");
        assert_eq!(headings[1].text, "Story");
        assert_eq!(headings[1].line, 7);
    }

    #[test]
    fn test_sections_nest_subsections() {
        let text = "# Story 1.1: Demo\n\n## Dev Notes\n\nintro\n\n### Learnings\n\nlearned\n\n## Change Log\n\n- v1\n";
        let sections = split_sections(text, 0);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Story 1.1: Demo", "Dev Notes", "Learnings", "Change Log"]);

        let dev_notes = &sections[1];
        assert_eq!(dev_notes.start_line, 3);
        assert_eq!(dev_notes.end_line, 10);
        assert!(dev_notes.raw_text.contains("learned"));

        let learnings = &sections[2];
        assert_eq!(learnings.raw_text.trim(), "learned");

        let change_log = &sections[3];
        assert_eq!(change_log.end_line, 13);
        assert_eq!(change_log.raw_text.trim(), "- v1");
    }

    #[test]
    fn test_sections_apply_line_offset() {
        let sections = split_sections("## Story\n\nAs a user", 4);
        assert_eq!(sections[0].start_line, 5);
        assert_eq!(sections[0].end_line, 7);
    }

    #[test]
    fn test_setext_heading_body_excludes_underline() {
        let text = "Story\n-----\n\nAs a user\n";
        let sections = split_sections(text, 0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Story");
        assert!(!sections[0].raw_text.contains("---"));
        assert!(sections[0].raw_text.contains("As a user"));
    }
}
