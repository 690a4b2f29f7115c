//! Citation extraction and resolution
//!
//! Recognized forms:
//! - `[Source: docs/tech-spec.md#Section, lines 10-20]` (also `line 7`),
//!   with further targets separated by `,` or `;`
//! - markdown links `[label](docs/architecture.md#L10-L20)`
//! - bare `docs/architecture.md:10-20` locations
//!
//! Citations are resolved against a [`PathIndex`]; unresolved ones are kept
//! with `resolved = false` so rules can tell "target missing" apart from
//! "nothing cited".

use crate::error::{ValidatorError, ValidatorResult};
use crate::models::Citation;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[source:\s*([^\]]*)\]").expect("valid source citation regex"));

static LINES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^lines?\s+(\d+)(?:\s*[-–]\s*(\d+))?$").expect("valid line range regex")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("valid link regex")
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s(`])((?:[\w.-]+/)*[\w.-]+\.(?:md|markdown|txt|rs|ts|js|py|yaml|yml|json|toml)):(\d+)(?:-(\d+))?\b",
    )
    .expect("valid location regex")
});

static LINE_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^L(\d+)(?:-L?(\d+))?$").expect("valid anchor regex"));

/// Extract citations from text, numbering lines from `line_offset + 1`
///
/// Fenced code blocks are skipped.
pub fn extract_citations(text: &str, line_offset: usize) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut in_fence = false;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        citations.extend(extract_from_line(line, line_offset + idx + 1));
    }

    citations
}

/// Parse a single bracketed citation such as `[Source: docs/x.md#Sec, lines 10-20]`
pub fn parse_citation(text: &str) -> Option<Citation> {
    let caps = SOURCE_RE.captures(text)?;
    source_citations(&caps[1], 0).into_iter().next()
}

fn extract_from_line(line: &str, line_number: usize) -> Vec<Citation> {
    // (column, citation) so mixed styles keep their textual order
    let mut found: Vec<(usize, Citation)> = Vec::new();
    let mut taken: Vec<(usize, usize)> = Vec::new();

    for caps in SOURCE_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        taken.push((whole.start(), whole.end()));
        found.extend(
            source_citations(&caps[1], line_number)
                .into_iter()
                .map(|citation| (whole.start(), citation)),
        );
    }

    for caps in LINK_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if overlaps(&taken, whole.start(), whole.end()) || &caps[1] == "!" {
            continue;
        }
        if let Some(citation) = link_citation(&caps[3], line_number) {
            taken.push((whole.start(), whole.end()));
            found.push((whole.start(), citation));
        }
    }

    for caps in LOCATION_RE.captures_iter(line) {
        let Some(path) = caps.get(1) else { continue };
        if overlaps(&taken, path.start(), path.end()) || path.as_str().contains("://") {
            continue;
        }
        let start = parse_number(caps.get(2).map(|m| m.as_str()));
        let end = parse_number(caps.get(3).map(|m| m.as_str())).or(start);
        let mut citation = Citation::new(path.as_str(), line_number);
        if let (Some(start), Some(end)) = (start, end) {
            citation = citation.with_lines(start, end);
        }
        found.push((path.start(), citation));
    }

    found.sort_by_key(|(column, _)| *column);
    found.into_iter().map(|(_, citation)| citation).collect()
}

/// Citations inside one `[Source: ...]` body
///
/// Parts are split on `,` and `;`. A `lines X-Y` part applies to the target
/// before it; later parts that do not look like paths are ignored.
fn source_citations(body: &str, line_number: usize) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for (idx, part) in body.split([',', ';']).map(str::trim).enumerate() {
        if part.is_empty() {
            continue;
        }
        if let Some(caps) = LINES_RE.captures(part) {
            let start = parse_number(caps.get(1).map(|m| m.as_str()));
            let end = parse_number(caps.get(2).map(|m| m.as_str())).or(start);
            if let (Some(last), Some(start), Some(end)) = (citations.last_mut(), start, end) {
                last.line_range = Some((start, end));
            }
            continue;
        }
        if idx > 0 && !looks_like_path(part) {
            continue;
        }

        let (path, section) = match part.split_once('#') {
            Some((path, section)) => (path.trim(), Some(section.trim())),
            None => (part, None),
        };
        if path.is_empty() {
            continue;
        }
        let mut citation = Citation::new(path, line_number);
        if let Some(section) = section.filter(|s| !s.is_empty()) {
            citation = citation.with_section(section);
        }
        citations.push(citation);
    }

    citations
}

fn looks_like_path(part: &str) -> bool {
    let path = part.split('#').next().unwrap_or(part).trim();
    !path.is_empty()
        && !path.contains(char::is_whitespace)
        && (path.contains('/') || Path::new(path).extension().is_some())
}

fn link_citation(target: &str, line_number: usize) -> Option<Citation> {
    if target.starts_with('#') || target.contains("://") || target.starts_with("mailto:") {
        return None;
    }
    let target = target.replace("%20", " ");
    let (path, anchor) = match target.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor)),
        None => (target.as_str(), None),
    };
    if path.is_empty() {
        return None;
    }

    let mut citation = Citation::new(path, line_number);
    if let Some(anchor) = anchor.filter(|a| !a.is_empty()) {
        match LINE_ANCHOR_RE.captures(anchor) {
            Some(caps) => {
                let start = parse_number(caps.get(1).map(|m| m.as_str()));
                let end = parse_number(caps.get(2).map(|m| m.as_str())).or(start);
                if let (Some(start), Some(end)) = (start, end) {
                    citation = citation.with_lines(start, end);
                }
            }
            None => citation = citation.with_section(anchor),
        }
    }
    Some(citation)
}

fn parse_number(s: Option<&str>) -> Option<usize> {
    s.and_then(|s| s.parse().ok())
}

fn overlaps(taken: &[(usize, usize)], start: usize, end: usize) -> bool {
    taken.iter().any(|&(s, e)| start < e && s < end)
}

// =============================================================================
// Path Index
// =============================================================================

/// Normalize a path for comparison: forward slashes, no leading `./`
pub fn normalize_path(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

/// Path key relative to `root` when the path lies under it
///
/// Absolute paths outside `root` are compared again after canonicalizing both
/// sides, so symlinked temp dirs still match. Anything else is only normalized.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).ok().map(Path::to_path_buf).or_else(|| {
        if !path.is_absolute() {
            return None;
        }
        let canonical_root = std::fs::canonicalize(root).ok()?;
        let canonical = std::fs::canonicalize(path).ok()?;
        canonical
            .strip_prefix(&canonical_root)
            .ok()
            .map(Path::to_path_buf)
    });
    normalize_path(&relative.as_deref().unwrap_or(path).to_string_lossy())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Index of known document paths for citation resolution
///
/// Exact lookups hit the sorted set; suffix lookups only compare candidates
/// sharing the same file name. With a root set, absolute paths under it are
/// stored relative to it, so `/work/docs/a.md` and `docs/a.md` are one entry.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    root: Option<PathBuf>,
    paths: BTreeSet<String>,
    by_file_name: HashMap<String, Vec<String>>,
}

impl PathIndex {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    /// Empty index keying paths relative to `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Index every file under `dir` with one of the given extensions
    pub fn from_dir(dir: &Path, extensions: &[String]) -> ValidatorResult<Self> {
        let mut index = Self::default();
        index.scan_dir(dir, extensions)?;
        Ok(index)
    }

    /// Add every file under `dir` with one of the given extensions
    ///
    /// Paths are recorded as `dir` joined with the relative path, the way a
    /// story would cite them from the project root.
    pub fn scan_dir(&mut self, dir: &Path, extensions: &[String]) -> ValidatorResult<()> {
        if !dir.is_dir() {
            return Err(ValidatorError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "docs directory not found"),
            ));
        }

        let before = self.len();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                ValidatorError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches_ext = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
            if matches_ext {
                self.insert(&entry.path().to_string_lossy());
            }
        }

        tracing::debug!(dir = %dir.display(), documents = self.len() - before, "indexed known documents");
        Ok(())
    }

    /// The key a path is stored under
    pub fn key(&self, path: &str) -> String {
        match &self.root {
            Some(root) => relative_key(root, Path::new(path.trim())),
            None => normalize_path(path),
        }
    }

    pub fn insert(&mut self, path: &str) {
        let normalized = self.key(path);
        if normalized.is_empty() || !self.paths.insert(normalized.clone()) {
            return;
        }
        let bucket = self
            .by_file_name
            .entry(file_name(&normalized).to_string())
            .or_default();
        bucket.push(normalized);
        bucket.sort();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&self.key(path))
    }

    /// Resolve a cited path: exact match first, then path-suffix match
    pub fn resolve(&self, target: &str) -> Option<&str> {
        let normalized = self.key(target);
        if let Some(exact) = self.paths.get(&normalized) {
            return Some(exact.as_str());
        }

        let candidates = self.by_file_name.get(file_name(&normalized))?;
        let mut matches = candidates.iter().filter(|known| {
            known.ends_with(&format!("/{}", normalized))
                || normalized.ends_with(&format!("/{}", known))
        });
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::debug!(target = %normalized, chosen = %first, "ambiguous citation suffix match");
        }
        Some(first.as_str())
    }

    /// Known paths in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Resolve citations in place against the index
pub fn resolve_citations(citations: &mut [Citation], index: &PathIndex) {
    for citation in citations.iter_mut() {
        match index.resolve(&citation.target_path) {
            Some(known) => {
                citation.resolved = true;
                citation.resolved_path = Some(known.to_string());
            }
            None => {
                citation.resolved = false;
                citation.resolved_path = None;
                tracing::warn!(
                    target_path = %citation.target_path,
                    line = citation.line,
                    "citation target not found among known documents"
                );
            }
        }
    }
}
