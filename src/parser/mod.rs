pub mod citation;
pub mod frontmatter;
pub mod markdown;
pub mod story;

pub use citation::{
    extract_citations, normalize_path, parse_citation, relative_key, resolve_citations,
    PathIndex,
};
pub use frontmatter::{calculate_checksum, normalize_content, split_frontmatter, StoryFrontmatter};
pub use markdown::{collect_headings, split_sections, Heading, LineIndex};
pub use story::{parse_reference, parse_story, referenced_criteria};
