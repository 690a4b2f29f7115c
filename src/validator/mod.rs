pub mod engine;
pub mod pipeline;
pub mod rules;
pub mod severity;

pub use engine::ChecklistEngine;
pub use pipeline::{read_document, ValidationRequest, Validator};
pub use rules::{is_placeholder, Rule, RuleCategory, RuleContext, Scratch};
pub use severity::classify;
