//! End-to-end validation of one story: parse, resolve, check, classify, report

use crate::error::{ParseError, ValidatorError, ValidatorResult};
use crate::models::{DocumentModel, Report, ValidatorConfig};
use crate::parser::{parse_reference, parse_story, relative_key, resolve_citations, PathIndex};
use crate::report::ReportBuilder;
use crate::validator::engine::ChecklistEngine;
use crate::validator::rules::RuleContext;
use crate::validator::severity::classify;
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Files making up one validation run
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    pub story: PathBuf,
    pub previous: Option<PathBuf>,
    pub tech_spec: Option<PathBuf>,
    pub docs_dir: Option<PathBuf>,
}

/// Read a document, mapping failures to the fatal I/O tier
pub fn read_document(path: &Path) -> ValidatorResult<String> {
    std::fs::read_to_string(path).map_err(|e| ValidatorError::io(path, e))
}

/// Validator configured once and reused across documents
///
/// Document paths are keyed relative to `root` (the working directory by
/// default), so a story, its tech spec and the docs directory agree on one
/// spelling of each path whether they were given absolute or relative.
pub struct Validator {
    config: ValidatorConfig,
    relevance: Vec<Pattern>,
    engine: ChecklistEngine,
    root: PathBuf,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> ValidatorResult<Self> {
        let relevance = config.relevance_patterns()?;
        let root = std::env::current_dir().map_err(|e| ValidatorError::io(".", e))?;
        Ok(Self {
            config,
            relevance,
            engine: ChecklistEngine::new(),
            root,
        })
    }

    /// Key document paths relative to `root` instead of the working directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The path a document is known by in models, the index and reports
    pub fn doc_path(&self, path: &Path) -> String {
        relative_key(&self.root, path)
    }

    /// Build the known-document index from the docs directory plus extra paths
    pub fn known_docs(&self, docs_dir: Option<&Path>, extra: &[&Path]) -> ValidatorResult<PathIndex> {
        let mut index = PathIndex::with_root(&self.root);
        if let Some(dir) = docs_dir {
            index.scan_dir(dir, &self.config.doc_extensions)?;
        }
        for path in extra {
            index.insert(&path.to_string_lossy());
        }
        Ok(index)
    }

    /// Parse a tech spec file
    pub fn load_tech_spec(&self, path: &Path) -> ValidatorResult<DocumentModel> {
        let text = read_document(path)?;
        Ok(parse_reference(&text, &self.doc_path(path))?)
    }

    /// Parse a previous story, degrading to `None` when it is not a story
    pub fn load_previous(&self, path: &Path) -> ValidatorResult<Option<DocumentModel>> {
        let text = read_document(path)?;
        match parse_story(&text, &self.doc_path(path)) {
            Ok(model) => Ok(Some(model)),
            Err(err @ ParseError::NotAStory { .. }) => {
                tracing::warn!(error = %err, "previous document ignored, continuity checks skipped");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Validate the files named by a request
    pub fn validate_files(&self, request: &ValidationRequest) -> ValidatorResult<Report> {
        let text = read_document(&request.story)?;
        let story = parse_story(&text, &self.doc_path(&request.story))?;

        let previous = match &request.previous {
            Some(path) => self.load_previous(path)?,
            None => None,
        };
        let tech_spec = match &request.tech_spec {
            Some(path) => Some(self.load_tech_spec(path)?),
            None => None,
        };

        let mut extra: Vec<&Path> = vec![request.story.as_path()];
        extra.extend(request.previous.as_deref());
        extra.extend(request.tech_spec.as_deref());
        let index = self.known_docs(request.docs_dir.as_deref(), &extra)?;

        Ok(self.validate_model(story, previous.as_ref(), tech_spec.as_ref(), &index))
    }

    /// Validate story text directly
    ///
    /// The story path and the tech spec path are added to `known_docs`.
    pub fn validate_text(
        &self,
        text: &str,
        path: &str,
        previous: Option<&DocumentModel>,
        tech_spec: Option<&DocumentModel>,
        known_docs: &PathIndex,
    ) -> ValidatorResult<Report> {
        let story = parse_story(text, path)?;
        let mut index = known_docs.clone();
        index.insert(path);
        if let Some(spec) = tech_spec {
            index.insert(&spec.path);
        }
        Ok(self.validate_model(story, previous, tech_spec, &index))
    }

    /// Run the checklist over an already parsed story
    pub fn validate_model(
        &self,
        mut story: DocumentModel,
        previous: Option<&DocumentModel>,
        tech_spec: Option<&DocumentModel>,
        known_docs: &PathIndex,
    ) -> Report {
        resolve_citations(&mut story.citations, known_docs);

        let ctx = RuleContext {
            previous,
            tech_spec,
            known_docs,
            config: &self.config,
            relevance: &self.relevance,
        };
        let results = self.engine.run(&story, &ctx);
        let issues = classify(&results);
        ReportBuilder::new(&story).build(&results, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use std::fs;
    use tempfile::TempDir;

    const STORY: &str = "# Story 1.1: Setup\n\nStatus: drafted\n\n## Story\n\nAs a dev, I want a repo, so that I can work.\n\n## Acceptance Criteria\n\n1. Given a clone, when I build, then it compiles [Source: docs/tech-spec.md#AC1]\n";

    #[test]
    fn test_validate_files_reads_docs_dir() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("tech-spec.md"), "# Tech Spec\n").unwrap();
        let story = dir.path().join("1-1-setup.md");
        fs::write(&story, STORY).unwrap();

        let validator = Validator::new(ValidatorConfig::default()).unwrap();
        let report = validator
            .validate_files(&ValidationRequest {
                story,
                docs_dir: Some(docs),
                ..Default::default()
            })
            .unwrap();

        assert!(report.issues.iter().all(|i| !i.description.contains("citation target missing")));
        assert!(report.successes.iter().any(|s| s.rule_id == "sources.coverage"));
    }

    #[test]
    fn test_absolute_tech_spec_matches_docs_dir_entry() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::create_dir_all(dir.path().join("stories")).unwrap();
        fs::write(docs.join("tech-spec.md"), "# Tech Spec\n\n## Acceptance Criteria\n\n1. AC1: Given a clone, when I build, then it compiles\n").unwrap();
        let story = dir.path().join("stories/1-1-setup.md");
        fs::write(&story, STORY).unwrap();

        let validator = Validator::new(ValidatorConfig::default())
            .unwrap()
            .with_root(dir.path());
        let spec = docs.join("tech-spec.md");
        let index = validator.known_docs(Some(&docs), &[spec.as_path()]).unwrap();
        assert_eq!(index.iter().collect::<Vec<_>>(), vec!["docs/tech-spec.md"]);

        let report = validator
            .validate_files(&ValidationRequest {
                story,
                tech_spec: Some(spec),
                docs_dir: Some(docs),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.document_path, "stories/1-1-setup.md");
        assert!(report.successes.iter().any(|s| s.rule_id == "sources.tech-spec-cited"));
        assert!(
            report.issues.iter().all(|i| !i.description.contains("is not cited")),
            "{:?}",
            report.issues
        );
    }

    #[test]
    fn test_missing_story_is_io_error() {
        let validator = Validator::new(ValidatorConfig::default()).unwrap();
        let err = validator
            .validate_files(&ValidationRequest {
                story: PathBuf::from("/nonexistent/story.md"),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ValidatorError::Io { .. }));
        assert!(!err.is_skippable());
    }

    #[test]
    fn test_non_story_previous_is_ignored() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes.md");
        fs::write(&notes, "# Notes\n\nnothing here\n").unwrap();

        let validator = Validator::new(ValidatorConfig::default()).unwrap();
        assert!(validator.load_previous(&notes).unwrap().is_none());
    }

    #[test]
    fn test_unresolved_tech_spec_citation() {
        let validator = Validator::new(ValidatorConfig::default()).unwrap();
        let report = validator
            .validate_text(STORY, "stories/1-1-setup.md", None, None, &PathIndex::default())
            .unwrap();

        let missing: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.description.contains("citation target missing"))
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].severity, Severity::Major);
        assert_eq!(missing[0].rule_ids, vec!["sources.citations-resolved".to_string()]);
    }
}
