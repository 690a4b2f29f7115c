//! The checklist rule catalogue
//!
//! Rules are a closed set: every variant knows its id, severity and the
//! context it needs at compile time. Evaluation is pure; the only state a
//! rule may observe beyond the model and context is the engine scratch
//! passed in by [`crate::validator::ChecklistEngine`].

use crate::models::{
    CheckResult, Criterion, DocumentModel, Finding, ParseWarning, Section, Severity,
    ValidatorConfig,
};
use crate::parser::PathIndex;
use glob::Pattern;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{[^}]*\}\}|<[^>]*>|\bTBD\b|\bTODO\b|\bN/A\b|\bplaceholder\b|\.\.\.")
        .expect("valid placeholder regex")
});

static STORY_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bas\s+an?\b.+?\bi\s+want\b.+?\bso\s+that\b")
        .expect("valid story statement regex")
});

static SOURCE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[source:[^\]]*\]").expect("valid source text regex"));

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("valid word regex"));

static LEADING_TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\s*\[[^\]]*\])+\s*").expect("valid tag regex"));

const STOP_WORDS: [&str; 14] = [
    "the", "and", "for", "with", "that", "this", "are", "from", "into", "then", "when", "given",
    "should", "must",
];

/// Evidence quotes are cut to this many characters
const QUOTE_LIMIT: usize = 80;

/// Grouping used in the rule listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Metadata,
    Continuity,
    Sources,
    AcceptanceCriteria,
    Tasks,
    Structure,
}

impl RuleCategory {
    pub fn name(&self) -> &'static str {
        match self {
            RuleCategory::Metadata => "Metadata",
            RuleCategory::Continuity => "Continuity",
            RuleCategory::Sources => "Sources",
            RuleCategory::AcceptanceCriteria => "Acceptance Criteria",
            RuleCategory::Tasks => "Tasks",
            RuleCategory::Structure => "Structure",
        }
    }
}

/// Inputs shared by every rule in one run
pub struct RuleContext<'a> {
    pub previous: Option<&'a DocumentModel>,
    pub tech_spec: Option<&'a DocumentModel>,
    pub known_docs: &'a PathIndex,
    pub config: &'a ValidatorConfig,
    /// Compiled `config.relevant_doc_patterns`
    pub relevance: &'a [Pattern],
}

impl RuleContext<'_> {
    /// The index's spelling of a document path, so citations compare by identity
    pub fn known_path<'s>(&'s self, path: &'s str) -> &'s str {
        self.known_docs.resolve(path).unwrap_or(path)
    }

    /// Known documents matching a relevance pattern, in sorted order
    pub fn relevant_docs(&self) -> Vec<&str> {
        self.known_docs
            .iter()
            .filter(|&path| {
                let name = path.rsplit('/').next().unwrap_or(path);
                self.relevance
                    .iter()
                    .any(|p| p.matches(path) || p.matches(name))
            })
            .collect()
    }
}

/// Values computed by earlier rules and read by later ones
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    pub criteria_count: Option<usize>,
}

impl Scratch {
    fn criteria_count(&self, model: &DocumentModel) -> usize {
        self.criteria_count
            .unwrap_or(model.acceptance_criteria.len())
    }
}

/// A checklist rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Title,
    RequiredSections,
    Learnings,
    ActionItems,
    HasCitations,
    CitationsResolved,
    TechSpecCited,
    SourceCoverage,
    CriteriaPresent,
    CriteriaWellFormed,
    TechSpecCoverage,
    InventedCriteria,
    TasksCoverCriteria,
    TasksReferenceCriteria,
    TestingSubtasks,
    Status,
    StoryStatement,
    DevRecord,
    ChangeLog,
    DuplicateSections,
}

impl Rule {
    /// Every rule in execution order
    pub const ALL: [Rule; 20] = [
        Rule::Title,
        Rule::RequiredSections,
        Rule::Learnings,
        Rule::ActionItems,
        Rule::HasCitations,
        Rule::CitationsResolved,
        Rule::TechSpecCited,
        Rule::SourceCoverage,
        Rule::CriteriaPresent,
        Rule::CriteriaWellFormed,
        Rule::TechSpecCoverage,
        Rule::InventedCriteria,
        Rule::TasksCoverCriteria,
        Rule::TasksReferenceCriteria,
        Rule::TestingSubtasks,
        Rule::Status,
        Rule::StoryStatement,
        Rule::DevRecord,
        Rule::ChangeLog,
        Rule::DuplicateSections,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Rule::Title => "metadata.title",
            Rule::RequiredSections => "metadata.required-sections",
            Rule::Learnings => "continuity.learnings",
            Rule::ActionItems => "continuity.action-items",
            Rule::HasCitations => "sources.has-citations",
            Rule::CitationsResolved => "sources.citations-resolved",
            Rule::TechSpecCited => "sources.tech-spec-cited",
            Rule::SourceCoverage => "sources.coverage",
            Rule::CriteriaPresent => "ac.present",
            Rule::CriteriaWellFormed => "ac.well-formed",
            Rule::TechSpecCoverage => "ac.tech-spec-coverage",
            Rule::InventedCriteria => "ac.invented",
            Rule::TasksCoverCriteria => "tasks.cover-criteria",
            Rule::TasksReferenceCriteria => "tasks.reference-criteria",
            Rule::TestingSubtasks => "tasks.testing-subtasks",
            Rule::Status => "structure.status",
            Rule::StoryStatement => "structure.story-statement",
            Rule::DevRecord => "structure.dev-record",
            Rule::ChangeLog => "structure.change-log",
            Rule::DuplicateSections => "structure.duplicate-sections",
        }
    }

    pub fn from_id(id: &str) -> Option<Rule> {
        Rule::ALL.iter().copied().find(|r| r.id() == id)
    }

    /// Severity of the issues this rule raises when it fails
    pub fn severity(&self) -> Severity {
        match self {
            Rule::RequiredSections | Rule::TechSpecCited | Rule::TechSpecCoverage => {
                Severity::Critical
            }
            Rule::InventedCriteria
            | Rule::TasksReferenceCriteria
            | Rule::TestingSubtasks
            | Rule::ChangeLog
            | Rule::DuplicateSections => Severity::Minor,
            _ => Severity::Major,
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self {
            Rule::Title | Rule::RequiredSections => RuleCategory::Metadata,
            Rule::Learnings | Rule::ActionItems => RuleCategory::Continuity,
            Rule::HasCitations
            | Rule::CitationsResolved
            | Rule::TechSpecCited
            | Rule::SourceCoverage => RuleCategory::Sources,
            Rule::CriteriaPresent
            | Rule::CriteriaWellFormed
            | Rule::TechSpecCoverage
            | Rule::InventedCriteria => RuleCategory::AcceptanceCriteria,
            Rule::TasksCoverCriteria | Rule::TasksReferenceCriteria | Rule::TestingSubtasks => {
                RuleCategory::Tasks
            }
            Rule::Status
            | Rule::StoryStatement
            | Rule::DevRecord
            | Rule::ChangeLog
            | Rule::DuplicateSections => RuleCategory::Structure,
        }
    }

    /// One-line statement of what a passing document satisfies
    pub fn description(&self) -> &'static str {
        match self {
            Rule::Title => "Story has a title",
            Rule::RequiredSections => "All required sections are present",
            Rule::Learnings => "Learnings from the previous story are captured and cited",
            Rule::ActionItems => "Unresolved action items from the previous story are carried forward",
            Rule::HasCitations => "Story cites its source documents",
            Rule::CitationsResolved => "Every citation points at a known document",
            Rule::TechSpecCited => "The tech spec is cited",
            Rule::SourceCoverage => "Every relevant project document is cited",
            Rule::CriteriaPresent => "Acceptance criteria are listed",
            Rule::CriteriaWellFormed => "Each acceptance criterion is testable",
            Rule::TechSpecCoverage => "Every tech spec criterion has a story criterion",
            Rule::InventedCriteria => "Story criteria trace back to the tech spec",
            Rule::TasksCoverCriteria => "Every acceptance criterion is covered by a task",
            Rule::TasksReferenceCriteria => "Every task references an acceptance criterion",
            Rule::TestingSubtasks => "Tasks include testing work",
            Rule::Status => "Status is set",
            Rule::StoryStatement => "Story statement follows As a / I want / so that",
            Rule::DevRecord => "Dev record section is present",
            Rule::ChangeLog => "Change log is present",
            Rule::DuplicateSections => "Section headings and criterion ids are unique",
        }
    }

    /// Context the rule needs to be applicable, for the rule listing
    pub fn needs(&self) -> Option<&'static str> {
        match self {
            Rule::Learnings | Rule::ActionItems => Some("previous story"),
            Rule::TechSpecCited => Some("tech spec"),
            Rule::SourceCoverage => Some("relevant known documents"),
            Rule::CriteriaWellFormed | Rule::TasksCoverCriteria => Some("acceptance criteria"),
            Rule::TechSpecCoverage => Some("tech spec criteria"),
            Rule::InventedCriteria => Some("tech spec criteria and acceptance criteria"),
            Rule::TasksReferenceCriteria | Rule::TestingSubtasks => Some("tasks"),
            _ => None,
        }
    }

    /// Evaluate the rule against a story
    pub fn evaluate(
        &self,
        model: &DocumentModel,
        ctx: &RuleContext<'_>,
        scratch: &Scratch,
    ) -> CheckResult {
        let id = self.id();
        match self {
            Rule::Title => check_title(id, model),
            Rule::RequiredSections => check_required_sections(id, model, ctx.config),
            Rule::Learnings => check_learnings(id, model, ctx),
            Rule::ActionItems => check_action_items(id, model, ctx),
            Rule::HasCitations => check_has_citations(id, model),
            Rule::CitationsResolved => check_citations_resolved(id, model),
            Rule::TechSpecCited => check_tech_spec_cited(id, model, ctx),
            Rule::SourceCoverage => check_source_coverage(id, model, ctx),
            Rule::CriteriaPresent => check_criteria_present(id, model),
            Rule::CriteriaWellFormed => check_criteria_well_formed(id, model, ctx, scratch),
            Rule::TechSpecCoverage => check_tech_spec_coverage(id, model, ctx),
            Rule::InventedCriteria => check_invented_criteria(id, model, ctx, scratch),
            Rule::TasksCoverCriteria => check_tasks_cover_criteria(id, model, scratch),
            Rule::TasksReferenceCriteria => check_tasks_reference_criteria(id, model),
            Rule::TestingSubtasks => check_testing_subtasks(id, model),
            Rule::Status => check_status(id, model, ctx.config),
            Rule::StoryStatement => check_story_statement(id, model),
            Rule::DevRecord => check_named_section(
                id,
                model,
                &ctx.config.record_sections,
                "Add a '## Dev Agent Record' section for the implementer's notes",
            ),
            Rule::ChangeLog => check_named_section(
                id,
                model,
                &ctx.config.change_log_sections,
                "Add a '## Change Log' section with a first entry",
            ),
            Rule::DuplicateSections => check_duplicate_sections(id, model),
        }
    }
}

/// Text with no content once template markers and filler are removed
pub fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE
        .replace_all(text, "")
        .chars()
        .all(|c| !c.is_alphanumeric())
}

/// Shorten text for evidence lines
fn quote(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= QUOTE_LIMIT {
        flat
    } else {
        let cut: String = flat.chars().take(QUOTE_LIMIT).collect();
        format!("{}...", cut)
    }
}

fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Find a section by name ignoring case and spacing (`Tasks/Subtasks` matches `Tasks / Subtasks`)
///
/// Falls back to a prefix match below the title level, so `Story 1.2: ...`
/// never stands in for `Story`.
fn find_section<'a>(model: &'a DocumentModel, name: &str) -> Option<&'a Section> {
    let wanted = compact(name);
    model
        .sections
        .values()
        .find(|s| compact(&s.name) == wanted)
        .or_else(|| {
            model
                .sections
                .values()
                .find(|s| s.level > 1 && compact(&s.name).starts_with(&wanted))
        })
}

/// Criterion id without separators, so `AC-2.1`, `AC 2.1` and `AC2.1` agree
fn criterion_key(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '.')
        .collect::<String>()
        .to_lowercase()
}

fn root_section_key(name: &str) -> String {
    format!("section:{}", name.trim().to_lowercase())
}

/// Lowercase word tokens used for criterion matching
fn tokens(text: &str) -> BTreeSet<String> {
    let cleaned = SOURCE_TEXT_RE.replace_all(text, " ");
    WORD_RE
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Overlap coefficient of the two token sets
fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (tokens(a), tokens(b));
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / smaller as f64
}

/// Whether a story criterion corresponds to a tech-spec criterion
///
/// The criterion's own citation is a parse-time copy, so its target is
/// resolved here rather than read from `resolved_path`.
fn criteria_match(
    story: &Criterion,
    spec: &Criterion,
    spec_path: &str,
    known_docs: &PathIndex,
    threshold: f64,
) -> bool {
    let cited = story.source_citation.as_ref().map_or(false, |c| {
        known_docs.resolve(&c.target_path) == Some(spec_path)
            && c
                .section
                .as_deref()
                .map_or(false, |s| criterion_key(s) == criterion_key(&spec.id))
    });
    cited || similarity(&story.body, &spec.body) >= threshold
}

fn check_title(id: &str, model: &DocumentModel) -> CheckResult {
    match model.title.as_deref() {
        Some(title) if !is_placeholder(title) => {
            CheckResult::pass(id, "title present").with_evidence(vec![format!("title: {}", quote(title))])
        }
        _ => CheckResult::fail(id, "story has no title").with_findings(vec![Finding::new(
            "Story has no title",
            "Add a '# Story X.Y: Title' heading or a frontmatter title",
        )]),
    }
}

fn check_required_sections(id: &str, model: &DocumentModel, config: &ValidatorConfig) -> CheckResult {
    let mut evidence = Vec::new();
    let mut findings = Vec::new();

    for name in &config.required_sections {
        match find_section(model, name) {
            Some(section) => evidence.push(format!("line {}: ## {}", section.start_line, section.name)),
            None => findings.push(
                Finding::new(
                    format!("Required section '{}' is missing", name),
                    format!("Add a '## {}' section", name),
                )
                .with_root_cause(root_section_key(name)),
            ),
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "all required sections present").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} required section(s) missing", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_learnings(id: &str, model: &DocumentModel, ctx: &RuleContext<'_>) -> CheckResult {
    let Some(previous) = ctx.previous else {
        return CheckResult::not_applicable(id, "no previous story supplied");
    };

    let wanted = &ctx.config.learnings_section;
    let section = find_section(model, wanted).or_else(|| model.section_containing("learnings"));
    let Some(section) = section else {
        return CheckResult::fail(id, "learnings subsection missing").with_findings(vec![Finding::new(
            format!("Missing '{}' subsection", wanted),
            format!(
                "Add '### {}' under Dev Notes summarizing what {} taught",
                wanted,
                previous.display_name()
            ),
        )]);
    };

    if is_placeholder(&section.raw_text) {
        return CheckResult::fail(id, "learnings subsection is empty")
            .with_evidence(vec![format!("line {}: ### {}", section.start_line, section.name)])
            .with_findings(vec![Finding::new(
                format!("'{}' has no content", section.name),
                format!("Summarize the learnings and open items from {}", previous.path),
            )]);
    }

    let stem = previous
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&previous.path)
        .trim_end_matches(".md");
    let cited = model
        .citations_in(section)
        .find(|c| c.references(ctx.known_path(&previous.path)));
    let mentioned = section.raw_text.contains(stem)
        || previous
            .story_key
            .as_deref()
            .map_or(false, |key| {
                section.raw_text.to_lowercase().contains(&format!("story {}", key))
            });

    match cited {
        Some(citation) => CheckResult::pass(id, "learnings cite the previous story").with_evidence(vec![
            format!("line {}: {}", citation.line, citation),
        ]),
        None if mentioned => CheckResult::pass(id, "learnings mention the previous story")
            .with_evidence(vec![format!("line {}: ### {}", section.start_line, section.name)]),
        None => CheckResult::fail(id, "learnings do not reference the previous story")
            .with_evidence(vec![format!("line {}: ### {}", section.start_line, section.name)])
            .with_findings(vec![Finding::new(
                format!("'{}' does not reference {}", section.name, previous.path),
                format!("Cite the previous story, e.g. [Source: {}]", previous.path),
            )]),
    }
}

/// Lowercased, tag-free, whitespace-collapsed form used to compare item text
fn normalize_item(text: &str) -> String {
    let stripped = LEADING_TAGS_RE.replace(text, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn check_action_items(id: &str, model: &DocumentModel, ctx: &RuleContext<'_>) -> CheckResult {
    let Some(previous) = ctx.previous else {
        return CheckResult::not_applicable(id, "no previous story supplied");
    };

    let open: Vec<_> = previous.unresolved_action_items().collect();
    if open.is_empty() {
        return CheckResult::pass(id, "previous story has no unresolved action items")
            .with_evidence(vec![format!("{}: no open action items", previous.path)]);
    }

    let corpus = model
        .sections
        .values()
        .map(|s| s.raw_text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let corpus = normalize_item(&corpus);

    let mut evidence = Vec::new();
    let mut findings = Vec::new();
    for item in open {
        let key = normalize_item(&item.text);
        if !key.is_empty() && corpus.contains(&key) {
            evidence.push(format!("carried forward: {}", quote(&item.text)));
        } else {
            findings.push(
                Finding::new(
                    format!(
                        "Unresolved action item from {} is not carried forward: {}",
                        previous.path,
                        quote(&item.text)
                    ),
                    "Carry the item into this story's tasks or learnings, or resolve it in the previous story",
                )
                .with_evidence(format!("{}:{}: {}", previous.path, item.line, quote(&item.text)))
                .with_root_cause(format!("action-item:{}", key)),
            );
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "all open action items carried forward").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} open action item(s) dropped", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_has_citations(id: &str, model: &DocumentModel) -> CheckResult {
    if model.citations.is_empty() {
        return CheckResult::fail(id, "no citations").with_findings(vec![Finding::new(
            "Story cites no source documents",
            "Cite the documents the story is derived from, e.g. [Source: docs/tech-spec.md#Section]",
        )]);
    }
    let evidence = model
        .citations
        .iter()
        .map(|c| format!("line {}: {}", c.line, c))
        .collect();
    CheckResult::pass(id, format!("{} citation(s)", model.citations.len())).with_evidence(evidence)
}

fn check_citations_resolved(id: &str, model: &DocumentModel) -> CheckResult {
    if model.citations.is_empty() {
        return CheckResult::not_applicable(id, "no citations to resolve");
    }

    let findings: Vec<_> = model
        .citations
        .iter()
        .filter(|c| !c.resolved)
        .map(|c| {
            let target = crate::parser::normalize_path(&c.target_path);
            Finding::new(
                format!("citation target missing: {}", target),
                format!("Fix the path of the citation or add {} to the docs directory", target),
            )
            .with_evidence(format!("line {}: {}", c.line, c))
            .with_root_cause(format!("missing:{}", target))
        })
        .collect();

    if findings.is_empty() {
        CheckResult::pass(id, "all citations resolve").with_evidence(vec![format!(
            "{} citation(s) resolve to known documents",
            model.citations.len()
        )])
    } else {
        CheckResult::fail(id, format!("{} citation(s) unresolved", findings.len())).with_findings(findings)
    }
}

fn check_tech_spec_cited(id: &str, model: &DocumentModel, ctx: &RuleContext<'_>) -> CheckResult {
    let Some(spec) = ctx.tech_spec else {
        return CheckResult::not_applicable(id, "no tech spec supplied");
    };

    let spec_path = ctx.known_path(&spec.path);
    match model.citations.iter().find(|c| c.references(spec_path)) {
        Some(citation) => CheckResult::pass(id, "tech spec cited")
            .with_evidence(vec![format!("line {}: {}", citation.line, citation)]),
        None => CheckResult::fail(id, "tech spec not cited").with_findings(vec![Finding::new(
            format!("Relevant document {} is not cited", spec_path),
            format!("Cite the tech spec, e.g. [Source: {}#Acceptance Criteria]", spec_path),
        )
        .with_root_cause(format!("uncited:{}", spec_path))]),
    }
}

fn check_source_coverage(id: &str, model: &DocumentModel, ctx: &RuleContext<'_>) -> CheckResult {
    let relevant = ctx.relevant_docs();
    if relevant.is_empty() {
        return CheckResult::not_applicable(
            id,
            format!("no relevant documents among {} known", ctx.known_docs.len()),
        );
    }

    let mut evidence = Vec::new();
    let mut findings = Vec::new();
    for path in relevant {
        match model.citations.iter().find(|c| c.references(path)) {
            Some(citation) => evidence.push(format!("{} cited at line {}", path, citation.line)),
            None => findings.push(
                Finding::new(
                    format!("Relevant document {} is not cited", path),
                    format!("Cite the sections of {} this story depends on", path),
                )
                .with_root_cause(format!("uncited:{}", path)),
            ),
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "all relevant documents cited").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} relevant document(s) uncited", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_criteria_present(id: &str, model: &DocumentModel) -> CheckResult {
    let count = model.acceptance_criteria.len();
    if count == 0 {
        return CheckResult::fail(id, "no acceptance criteria").with_findings(vec![Finding::new(
            "No acceptance criteria found",
            "List numbered acceptance criteria under '## Acceptance Criteria'",
        )]);
    }
    CheckResult::pass(id, format!("{} acceptance criteria", count)).with_evidence(
        model
            .acceptance_criteria
            .iter()
            .map(|c| format!("line {}: {}", c.start_line, c.id))
            .collect(),
    )
}

fn check_criteria_well_formed(
    id: &str,
    model: &DocumentModel,
    ctx: &RuleContext<'_>,
    scratch: &Scratch,
) -> CheckResult {
    if scratch.criteria_count(model) == 0 {
        return CheckResult::not_applicable(id, "no acceptance criteria");
    }

    let mut evidence = Vec::new();
    let mut findings = Vec::new();
    for criterion in &model.acceptance_criteria {
        if is_placeholder(&criterion.body) {
            findings.push(
                Finding::new(
                    format!("{} is empty", criterion.id),
                    format!("Write a testable statement for {}", criterion.id),
                )
                .with_evidence(format!("line {}", criterion.start_line)),
            );
        } else if ctx.config.require_given_when_then && criterion.given_when_then.is_none() {
            findings.push(
                Finding::new(
                    format!("{} lacks Given/When/Then structure", criterion.id),
                    format!("Rewrite {} as Given <context>, When <action>, Then <result>", criterion.id),
                )
                .with_evidence(format!("line {}: {}", criterion.start_line, quote(&criterion.title))),
            );
        } else {
            evidence.push(format!("line {}: {} {}", criterion.start_line, criterion.id, quote(&criterion.title)));
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "all criteria well formed").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} malformed criterion(s)", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_tech_spec_coverage(id: &str, model: &DocumentModel, ctx: &RuleContext<'_>) -> CheckResult {
    let Some(spec) = ctx.tech_spec else {
        return CheckResult::not_applicable(id, "no tech spec supplied");
    };
    if spec.acceptance_criteria.is_empty() {
        return CheckResult::not_applicable(id, "tech spec defines no acceptance criteria");
    }

    let threshold = ctx.config.ac_match_threshold;
    let spec_path = ctx.known_path(&spec.path);
    let mut evidence = Vec::new();
    let mut findings = Vec::new();
    for spec_ac in &spec.acceptance_criteria {
        let matched = model
            .acceptance_criteria
            .iter()
            .find(|c| criteria_match(c, spec_ac, spec_path, ctx.known_docs, threshold));
        match matched {
            Some(story_ac) => evidence.push(format!("tech spec {} -> {}", spec_ac.id, story_ac.id)),
            None => findings.push(
                Finding::new(
                    format!(
                        "Tech spec {} has no matching story criterion: {}",
                        spec_ac.id,
                        quote(&spec_ac.title)
                    ),
                    format!("Add an acceptance criterion covering tech spec {}", spec_ac.id),
                )
                .with_evidence(format!("{}:{}", spec_path, spec_ac.start_line))
                .with_root_cause(format!("spec-ac:{}", spec_ac.id)),
            ),
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "every tech spec criterion covered").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} tech spec criterion(s) uncovered", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_invented_criteria(
    id: &str,
    model: &DocumentModel,
    ctx: &RuleContext<'_>,
    scratch: &Scratch,
) -> CheckResult {
    let spec = match ctx.tech_spec {
        Some(spec) if !spec.acceptance_criteria.is_empty() => spec,
        Some(_) => return CheckResult::not_applicable(id, "tech spec defines no acceptance criteria"),
        None => return CheckResult::not_applicable(id, "no tech spec supplied"),
    };
    if scratch.criteria_count(model) == 0 {
        return CheckResult::not_applicable(id, "no acceptance criteria");
    }

    let threshold = ctx.config.ac_match_threshold;
    let spec_path = ctx.known_path(&spec.path);
    let findings: Vec<_> = model
        .acceptance_criteria
        .iter()
        .filter(|c| {
            !spec
                .acceptance_criteria
                .iter()
                .any(|s| criteria_match(c, s, spec_path, ctx.known_docs, threshold))
        })
        .map(|c| {
            Finding::new(
                format!("{} has no counterpart in the tech spec", c.id),
                format!("Trace {} to the tech spec or confirm it is intended", c.id),
            )
            .with_evidence(format!("line {}: {}", c.start_line, quote(&c.title)))
        })
        .collect();

    if findings.is_empty() {
        CheckResult::pass(id, "all criteria trace to the tech spec")
    } else {
        CheckResult::fail(id, format!("{} criterion(s) without tech spec source", findings.len()))
            .with_findings(findings)
    }
}

fn check_tasks_cover_criteria(id: &str, model: &DocumentModel, scratch: &Scratch) -> CheckResult {
    if scratch.criteria_count(model) == 0 {
        return CheckResult::not_applicable(id, "no acceptance criteria");
    }

    let mut evidence = Vec::new();
    let mut findings = Vec::new();
    for criterion in &model.acceptance_criteria {
        let covering: Vec<_> = model
            .tasks
            .iter()
            .filter(|t| t.referenced_criteria_ids.contains(&criterion.id))
            .map(|t| t.id.as_str())
            .collect();
        if covering.is_empty() {
            findings.push(Finding::new(
                format!("{} is not covered by any task", criterion.id),
                format!("Reference {} from a task, e.g. '(AC: #{})'", criterion.id, criterion.id.trim_start_matches("AC")),
            ));
        } else {
            evidence.push(format!("{} <- {}", criterion.id, covering.join(", ")));
        }
    }

    if findings.is_empty() {
        CheckResult::pass(id, "every criterion covered").with_evidence(evidence)
    } else {
        CheckResult::fail(id, format!("{} criterion(s) uncovered", findings.len()))
            .with_evidence(evidence)
            .with_findings(findings)
    }
}

fn check_tasks_reference_criteria(id: &str, model: &DocumentModel) -> CheckResult {
    if model.tasks.is_empty() {
        return CheckResult::not_applicable(id, "no tasks");
    }

    let findings: Vec<_> = model
        .tasks
        .iter()
        .filter(|t| t.referenced_criteria_ids.is_empty() && !t.is_testing_task)
        .map(|t| {
            Finding::new(
                format!("{} '{}' references no acceptance criterion", t.id, quote(&t.title)),
                format!("Tag {} with the criteria it implements, e.g. '(AC: #1)'", t.id),
            )
            .with_evidence(format!("line {}", t.line))
        })
        .collect();

    if findings.is_empty() {
        CheckResult::pass(id, "every task references a criterion")
    } else {
        CheckResult::fail(id, format!("{} task(s) without criteria", findings.len())).with_findings(findings)
    }
}

fn check_testing_subtasks(id: &str, model: &DocumentModel) -> CheckResult {
    if model.tasks.is_empty() {
        return CheckResult::not_applicable(id, "no tasks");
    }

    let evidence: Vec<_> = model
        .tasks
        .iter()
        .filter(|t| t.is_testing_task || t.has_testing_subtask)
        .map(|t| format!("line {}: {}", t.line, t.id))
        .collect();

    if evidence.is_empty() {
        CheckResult::fail(id, "no testing work planned").with_findings(vec![Finding::new(
            "No task or subtask covers testing",
            "Add testing subtasks that verify each acceptance criterion",
        )])
    } else {
        CheckResult::pass(id, "testing work planned").with_evidence(evidence)
    }
}

fn check_status(id: &str, model: &DocumentModel, config: &ValidatorConfig) -> CheckResult {
    match model.status.as_deref() {
        Some(status) if !is_placeholder(status) => {
            if config.status_allowed(status) {
                CheckResult::pass(id, "status set").with_evidence(vec![format!("status: {}", status)])
            } else {
                CheckResult::fail(id, "status not allowed").with_findings(vec![Finding::new(
                    format!("Status '{}' is not an allowed value", status),
                    format!("Use one of: {}", config.allowed_statuses.join(", ")),
                )])
            }
        }
        _ => CheckResult::fail(id, "status missing").with_findings(vec![Finding::new(
            "Status field is missing",
            "Add a 'Status: drafted' line below the title",
        )]),
    }
}

fn check_story_statement(id: &str, model: &DocumentModel) -> CheckResult {
    let Some(section) = find_section(model, "Story") else {
        return CheckResult::fail(id, "story section missing").with_findings(vec![Finding::new(
            "Required section 'Story' is missing",
            "Add a '## Story' section",
        )
        .with_root_cause(root_section_key("Story"))]);
    };

    let evidence = vec![format!("line {}: {}", section.start_line + 1, quote(&section.raw_text))];
    if is_placeholder(&section.raw_text) {
        return CheckResult::fail(id, "story statement empty").with_findings(vec![Finding::new(
            "Story statement is empty",
            "Write the story as 'As a <role>, I want <goal>, so that <benefit>'",
        )]);
    }
    if STORY_STATEMENT_RE.is_match(&section.raw_text) {
        CheckResult::pass(id, "story statement well formed").with_evidence(evidence)
    } else {
        CheckResult::fail(id, "story statement malformed")
            .with_evidence(evidence)
            .with_findings(vec![Finding::new(
                "Story statement does not follow 'As a / I want / so that'",
                "Rewrite the story as 'As a <role>, I want <goal>, so that <benefit>'",
            )])
    }
}

/// Shared check for sections that must exist with content under one of several names
fn check_named_section(
    id: &str,
    model: &DocumentModel,
    names: &[String],
    recommendation: &str,
) -> CheckResult {
    let label = names.first().map(String::as_str).unwrap_or("section");
    let Some(section) = names.iter().find_map(|n| find_section(model, n)) else {
        return CheckResult::fail(id, format!("{} missing", label)).with_findings(vec![Finding::new(
            format!("Section '{}' is missing", label),
            recommendation,
        )
        .with_root_cause(root_section_key(label))]);
    };

    let evidence = vec![format!("line {}: ## {}", section.start_line, section.name)];
    if is_placeholder(&section.raw_text) {
        CheckResult::fail(id, format!("{} empty", label))
            .with_evidence(evidence)
            .with_findings(vec![Finding::new(
                format!("Section '{}' has no content", section.name),
                recommendation,
            )])
    } else {
        CheckResult::pass(id, format!("{} present", label)).with_evidence(evidence)
    }
}

fn check_duplicate_sections(id: &str, model: &DocumentModel) -> CheckResult {
    let findings: Vec<_> = model
        .warnings
        .iter()
        .filter_map(|w| match w {
            ParseWarning::DuplicateSection {
                name,
                first_line,
                line,
            } => Some(
                Finding::new(
                    format!("Section '{}' appears more than once", name),
                    format!("Merge the '{}' sections; only the last one is read", name),
                )
                .with_evidence(format!("lines {} and {}", first_line, line)),
            ),
            ParseWarning::DuplicateCriterion { id: criterion, line } => Some(
                Finding::new(
                    format!("Acceptance criterion {} is defined more than once", criterion),
                    format!("Renumber the criteria; only the first {} is read", criterion),
                )
                .with_evidence(format!("line {}", line)),
            ),
        })
        .collect();

    if findings.is_empty() {
        CheckResult::pass(id, "section headings and criterion ids unique")
    } else {
        CheckResult::fail(id, format!("{} duplicate heading(s) or criterion id(s)", findings.len()))
            .with_findings(findings)
    }
}
