use std::fmt::Write;

use super::types::SectionKind;
use crate::chunk::ChunkPlan;
use crate::pr::PullRequest;

const SYSTEM_PROMPT: &str = "You are a senior code reviewer. You review pull requests for \
correctness, security, performance and maintainability, and you give specific, actionable \
feedback tied to the code you were shown. Only comment on the diff provided. \
Answer with a single JSON object and nothing else.";

/// A fully rendered prompt for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPrompt {
    pub section: SectionKind,
    pub system: String,
    pub user: String,
}

fn instructions(section: SectionKind) -> &'static str {
    match section {
        SectionKind::Quality => {
            "Assess overall code quality: readability, naming, structure, error handling, \
             tests and documentation. List what the change does well under \"strengths\" and \
             rate the code quality from 1 to 10 in \"score\"."
        }
        SectionKind::Issues => {
            "Find potential bugs, logic errors, unhandled edge cases and regressions \
             introduced by this change."
        }
        SectionKind::Security => {
            "Find security problems: injection, missing authorization, unsafe handling of \
             secrets or credentials, unsafe deserialization and risky dependencies."
        }
        SectionKind::Performance => {
            "Find performance problems: needless allocation or copying, blocking calls on \
             hot paths, quadratic loops, missing caching and unbounded growth."
        }
    }
}

fn response_shape(section: SectionKind) -> &'static str {
    if section == SectionKind::Quality {
        r#"{"summary": "<one paragraph>", "findings": ["..."], "strengths": ["..."], "recommendations": ["..."], "score": <1-10>}"#
    } else {
        r#"{"summary": "<one paragraph>", "findings": ["..."], "recommendations": ["..."]}"#
    }
}

/// Render the prompt for `section` from the PR metadata and the planned diff text.
pub fn build(pr: &PullRequest, plan: &ChunkPlan<'_>, section: SectionKind) -> SectionPrompt {
    let mut user = String::new();

    let _ = writeln!(user, "# {} review\n", section.title());
    let _ = writeln!(user, "{}\n", instructions(section));

    let _ = writeln!(user, "## Pull request");
    let _ = writeln!(user, "Repository: {}/{}", pr.owner, pr.repo);
    let _ = writeln!(user, "PR #{}: {}", pr.number, pr.title);
    let _ = writeln!(user, "Author: {}", pr.author);
    let _ = writeln!(
        user,
        "Files changed: {} | +{} -{}",
        pr.files.len(),
        pr.additions(),
        pr.deletions()
    );
    let description = pr.description.trim();
    if !description.is_empty() {
        let _ = writeln!(user, "\nDescription:\n{description}");
    }

    let _ = writeln!(user, "\n## Changes");
    if plan.is_empty() {
        let _ = writeln!(user, "No file diffs are available for this pull request.");
    } else if plan.entries().len() < plan.files_total() {
        let _ = writeln!(
            user,
            "Only {} of {} changed files fit in this review; judge only what is shown.",
            plan.entries().len(),
            plan.files_total()
        );
    }
    for entry in plan.entries() {
        let file = entry.file;
        let marker = if entry.truncated { " (truncated)" } else { "" };
        let _ = writeln!(
            user,
            "\n### {} ({}, +{} -{}){marker}",
            file.path, file.change, file.additions, file.deletions
        );
        let _ = writeln!(user, "```diff\n{}\n```", entry.text.trim_end());
    }

    let _ = writeln!(user, "\n## Response format");
    let _ = write!(user, "Respond with JSON shaped like:\n{}", response_shape(section));

    SectionPrompt {
        section,
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
