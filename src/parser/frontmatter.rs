//! YAML Frontmatter Handling
//!
//! Stories may open with a `---` delimited YAML block carrying `title` and
//! `status`. This module handles:
//! - BOM (Byte Order Mark) stripping
//! - Line ending normalization (CRLF → LF)
//! - Splitting frontmatter from body while keeping body line numbers stable
//! - SHA256 checksums of normalized content

use crate::error::ParseError;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static CLOSING_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---[ \t]*$").expect("valid delimiter regex"));

/// Metadata keys a story may declare in frontmatter
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StoryFrontmatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Document split into frontmatter and body
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterSplit {
    /// Raw YAML between the delimiters
    pub raw: String,
    /// Markdown body after the closing delimiter
    pub body: String,
    /// Number of lines preceding the body in the original document
    pub body_line_offset: usize,
}

/// Normalize content: strip BOM, normalize line endings
///
/// Handles:
/// - UTF-8 BOM (EF BB BF / U+FEFF)
/// - CRLF → LF
/// - CR → LF (old Mac style)
pub fn normalize_content(content: &str) -> String {
    let stripped = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    stripped.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split frontmatter from body
///
/// Returns `Ok(None)` when the document does not start with `---`.
/// Frontmatter must end with `---` at column 0 (trailing whitespace allowed).
pub fn split_frontmatter(content: &str) -> Result<Option<FrontmatterSplit>, String> {
    let Some(after_open) = content.strip_prefix("---\n") else {
        return Ok(None);
    };

    let Some(m) = CLOSING_DELIMITER.find(after_open) else {
        return Err("frontmatter not properly closed (--- must be at line start)".to_string());
    };

    // every YAML line, blank ones included, ends in '\n' before the delimiter
    let block = &after_open[..m.start()];
    let yaml_lines = block.matches('\n').count();
    let raw = block.strip_suffix('\n').unwrap_or(block).to_string();
    let rest = &after_open[m.end()..];
    let body = rest.strip_prefix('\n').unwrap_or(rest).to_string();
    // Opening line, YAML lines, closing line
    let body_line_offset = 1 + yaml_lines + 1;

    Ok(Some(FrontmatterSplit {
        raw,
        body,
        body_line_offset,
    }))
}

/// Parse story metadata out of a frontmatter block
pub fn parse_story_frontmatter(raw: &str, path: &str) -> Result<StoryFrontmatter, ParseError> {
    if raw.trim().is_empty() {
        return Ok(StoryFrontmatter::default());
    }
    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| ParseError::Frontmatter {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    // Unknown keys are fine; only title/status are read
    Ok(StoryFrontmatter {
        title: scalar_string(value.get("title")),
        status: scalar_string(value.get("status")),
    })
}

fn scalar_string(value: Option<&serde_yaml::Value>) -> Option<String> {
    match value? {
        serde_yaml::Value::String(s) => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

// =============================================================================
// Checksum Functions
// =============================================================================

/// Normalize content for checksum calculation
///
/// Whitespace-only edits must not change the checksum:
/// - Normalize line endings (CRLF → LF)
/// - Trim trailing whitespace per line
/// - Remove trailing newlines
fn normalize_for_checksum(content: &str) -> String {
    normalize_content(content)
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

/// Calculate SHA256 checksum of normalized content
///
/// Returns checksum in format: `sha256:<hex>`
pub fn calculate_checksum(content: &str) -> String {
    let normalized = normalize_for_checksum(content);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

// =============================================================================
// Tests
// =============================================================================
