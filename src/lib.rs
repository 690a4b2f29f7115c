// storycheck - deterministic checklist validation for story documents
// Parses a story, resolves its citations, runs a fixed rule set and renders a report

pub mod cli;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod report;
pub mod validator;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use error::{ParseError, ValidatorError, ValidatorResult};
pub use models::{DocumentModel, Issue, Outcome, Report, Severity, ValidatorConfig};
pub use report::{render, ReportFormat};
pub use validator::{ChecklistEngine, Rule, ValidationRequest, Validator};
