//! Error taxonomy for the validation pipeline.
//!
//! Only conditions that stop a single document's run are errors here.
//! Citation problems and non-applicable rules surface as report content
//! instead (see `validator::engine`).

use std::path::PathBuf;

/// Result type for library operations
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// A document could not be turned into a story model
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{path} is not a story document (missing: {})", missing.join(", "))]
    NotAStory { path: String, missing: Vec<String> },

    #[error("Invalid frontmatter in {path}: {message}")]
    Frontmatter { path: String, message: String },
}

/// Errors that abort validation of one document
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ValidatorError {
    /// Wrap an I/O error with the path that caused it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ValidatorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the document should be skipped rather than treated as fatal
    pub fn is_skippable(&self) -> bool {
        matches!(self, ValidatorError::Parse(ParseError::NotAStory { .. }))
    }
}
