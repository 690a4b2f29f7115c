use crate::error::{ValidatorError, ValidatorResult};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "storycheck.toml";

/// Checklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Top-level sections every story must contain
    pub required_sections: Vec<String>,

    /// Accepted names for the record/footer section
    pub record_sections: Vec<String>,

    /// Accepted names for the change log section
    pub change_log_sections: Vec<String>,

    /// Subsection carrying learnings from the previous story
    pub learnings_section: String,

    /// Glob patterns selecting known documents that must be cited
    pub relevant_doc_patterns: Vec<String>,

    /// Whether each criterion needs Given/When/Then (or When/Then) structure
    pub require_given_when_then: bool,

    /// Minimum token overlap for a story criterion to match a tech-spec criterion
    pub ac_match_threshold: f64,

    /// Accepted status values (empty accepts any non-placeholder status)
    pub allowed_statuses: Vec<String>,

    /// File extensions collected from the docs directory
    pub doc_extensions: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            required_sections: vec![
                "Story".to_string(),
                "Acceptance Criteria".to_string(),
                "Tasks / Subtasks".to_string(),
                "Dev Notes".to_string(),
            ],
            record_sections: vec!["Dev Agent Record".to_string()],
            change_log_sections: vec!["Change Log".to_string()],
            learnings_section: "Learnings from Previous Story".to_string(),
            relevant_doc_patterns: vec![
                "**/tech-spec*.md".to_string(),
                "**/architecture*.md".to_string(),
                "**/prd*.md".to_string(),
                "**/epics*.md".to_string(),
            ],
            require_given_when_then: true,
            ac_match_threshold: 0.5,
            allowed_statuses: Vec::new(),
            doc_extensions: vec!["md".to_string()],
        }
    }
}

impl ValidatorConfig {
    /// Load config from an explicit file, `storycheck.toml` in `dir`, or defaults
    pub fn load(explicit: Option<&Path>, dir: &Path) -> ValidatorResult<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    tracing::debug!("no config file found, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ValidatorError::io(&config_path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and check a TOML document
    pub fn from_toml(content: &str) -> ValidatorResult<Self> {
        let config: ValidatorConfig =
            toml::from_str(content).map_err(|e| ValidatorError::Config(e.to_string()))?;
        config.relevance_patterns()?;
        if !(0.0..=1.0).contains(&config.ac_match_threshold) {
            return Err(ValidatorError::Config(format!(
                "ac_match_threshold must be between 0 and 1, got {}",
                config.ac_match_threshold
            )));
        }
        Ok(config)
    }

    /// Compiled relevance patterns
    pub fn relevance_patterns(&self) -> ValidatorResult<Vec<Pattern>> {
        self.relevant_doc_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    ValidatorError::Config(format!("invalid pattern '{}': {}", p, e))
                })
            })
            .collect()
    }

    /// Whether a status value is acceptable under `allowed_statuses`
    pub fn status_allowed(&self, status: &str) -> bool {
        self.allowed_statuses.is_empty()
            || self
                .allowed_statuses
                .iter()
                .any(|s| s.eq_ignore_ascii_case(status.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ValidatorConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.required_sections.len(), 4);
        assert!(config.require_given_when_then);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "require_given_when_then = false\nallowed_statuses = [\"drafted\"]\n",
        )
        .unwrap();

        let config = ValidatorConfig::load(None, dir.path()).unwrap();
        assert!(!config.require_given_when_then);
        assert_eq!(config.learnings_section, "Learnings from Previous Story");
        assert!(config.status_allowed("Drafted"));
        assert!(!config.status_allowed("done"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ValidatorConfig::from_toml("relevant_doc_patterns = [\"[\"]").unwrap_err();
        assert!(matches!(err, ValidatorError::Config(_)));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(ValidatorConfig::from_toml("ac_match_threshold = 1.5").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ValidatorConfig::load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ValidatorError::Io { .. }));
    }
}
