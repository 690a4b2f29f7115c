pub mod builder;
pub mod render;

pub use builder::ReportBuilder;
pub use render::{render, render_json, render_markdown, ReportFormat};
