//! Shared story fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub const PREVIOUS_STORY: &str = r#"# Story 1.1: Project Setup

Status: done

## Story

As a developer, I want a skeleton, so that work can start.

## Acceptance Criteria

1. Given a fresh clone, when I build, then it compiles

## Tasks / Subtasks

- [x] Task 1: Create skeleton (AC: #1)

## Dev Notes

Nothing special.

## Dev Agent Record

### Review Follow-ups (AI)

- [ ] [AI-Review][Med] Add rate limiting to the login endpoint
- [x] [AI-Review][Low] Rename helper

## Change Log

- Done
"#;

pub const STORY: &str = r#"# Story 1.2: User Login

Status: drafted

## Story

As a registered user,
I want to log in,
so that I can see my dashboard.

## Acceptance Criteria

1. Given a valid account, when the user submits credentials, then the dashboard is shown [Source: docs/tech-spec-epic-1.md#AC1]
2. Given a wrong password, when the user submits, then an error banner appears [Source: docs/tech-spec-epic-1.md#AC2]

## Tasks / Subtasks

- [ ] Task 1: Build login form (AC: #1, #2)
  - [ ] Write unit tests for the form
- [ ] Task 2: Handle failed logins (AC: #2)

## Dev Notes

Session handling follows [Source: docs/architecture.md#Auth, lines 10-20].

### Learnings from Previous Story

Reuse the auth client from [Source: stories/1-1-setup.md#Dev Agent Record].
Carried over: add rate limiting to the login endpoint.

## Dev Agent Record

### Agent Model Used

TBD

### Completion Notes

- Form scaffolded

## Change Log

- Draft created
"#;

/// Same story with an empty acceptance criteria section
pub const STORY_WITHOUT_CRITERIA: &str = r#"# Story 1.3: Password Reset

Status: drafted

## Story

As a user, I want to reset my password, so that I can recover access.

## Acceptance Criteria

## Tasks / Subtasks

- [ ] Task 1: Build reset form
  - [ ] Add tests

## Dev Notes

See [Source: docs/tech-spec-epic-1.md#Reset] and [Source: docs/architecture.md].

## Dev Agent Record

- Pending

## Change Log

- Draft created
"#;

pub const TECH_SPEC: &str = r#"# Epic Technical Specification: Accounts

## Acceptance Criteria (Authoritative)

1. AC1: Given a valid account, when the user submits credentials, then the dashboard is shown
2. AC2: Given a wrong password, when the user submits, then an error banner appears
"#;

/// Tech spec numbering its criteria per epic (`AC-2.1`, ...)
pub const DRAFTS_TECH_SPEC: &str = r#"# Epic Technical Specification: Drafts

## Acceptance Criteria

**AC-2.1:** Given a draft, when the writer saves, then it persists
**AC-2.2:** Given a saved draft, when the writer deletes it, then it is gone
**AC-2.3:** Given several drafts, when listed, then the newest comes first
"#;

/// Story using dotted criterion ids and a source naming two documents
pub const DRAFTS_STORY: &str = r#"# Story 2.1: Save Drafts

Status: drafted

## Story

As a writer,
I want my drafts saved,
so that nothing is lost.

## Acceptance Criteria

**AC-2.1:** Given a draft, when the writer saves, then it persists [Source: docs/tech-spec-epic-2.md#AC-2.1; docs/epics.md#Story-2.1]
**AC-2.2:** Given a saved draft, when the writer deletes it, then it is gone [Source: docs/tech-spec-epic-2.md#AC-2.2]

## Tasks / Subtasks

- [ ] Task 1: Persist drafts (AC: #2.1)
  - [ ] Write unit tests for saving
- [ ] Task 2: Delete drafts (AC: #2.2)

## Dev Notes

Storage follows [Source: docs/architecture.md#Auth, lines 10-20].

## Dev Agent Record

- Started

## Change Log

- Draft created
"#;

pub const EPICS: &str = "# Epics\n\n## Epic 2: Drafts\n\n### Story 2.1: Save Drafts\n";

pub const ARCHITECTURE: &str = "# Architecture\n\n## Auth\n\nSessions live in Redis.\n";

pub const NOTES: &str = "# Meeting Notes\n\nNothing to validate here.\n";

/// Lay out a project: `docs/` with the tech spec and architecture, `stories/` with two stories
pub fn write_project(root: &Path) {
    let docs = root.join("docs");
    let stories = root.join("stories");
    fs::create_dir_all(&docs).unwrap();
    fs::create_dir_all(&stories).unwrap();

    fs::write(docs.join("tech-spec-epic-1.md"), TECH_SPEC).unwrap();
    fs::write(docs.join("architecture.md"), ARCHITECTURE).unwrap();
    fs::write(stories.join("1-1-setup.md"), PREVIOUS_STORY).unwrap();
    fs::write(stories.join("1-2-user-login.md"), STORY).unwrap();
}
