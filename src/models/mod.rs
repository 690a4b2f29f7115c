pub mod config;
pub mod document;
pub mod validation;

pub use config::{ValidatorConfig, DEFAULT_CONFIG_FILE};
pub use document::{
    ActionItem, Citation, Criterion, DocumentModel, ParseWarning, Section, Subtask, Task,
};
pub use validation::{
    CheckResult, Finding, Issue, Outcome, Report, Severity, SeverityCounts, Skipped, Success,
};
