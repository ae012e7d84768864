//! Prompt templates for the planner and coder agents.
//!
//! Plain `format!` rendering; each template declares the state subset its
//! agent reads.

use crate::state::ReviewRole;
use crate::task::TaskRecord;
use std::collections::BTreeMap;

pub const PM_SYSTEM: &str = "You are a senior product manager. You write clear, complete product \
requirement documents in Markdown. Output only the document itself.";

pub const ARCHITECT_SYSTEM: &str = "You are a software architect. You produce a technical design \
and an implementable task breakdown from a PRD.";

pub fn pm_draft(requirement: &str) -> String {
    format!(
        "Write a product requirements document (PRD) for the following requirement.\n\
         Cover: overview, goals, user stories, functional requirements, acceptance criteria \
         and explicit non-goals.\n\n\
         Requirement:\n{requirement}\n"
    )
}

pub fn reviewer_system(role: ReviewRole) -> String {
    let lens = match role {
        ReviewRole::Pm => {
            "a principal product manager; judge scope, user value, prioritization and missing requirements"
        }
        ReviewRole::Dev => {
            "a staff engineer; judge technical feasibility, hidden complexity, integration risk and unclear behavior"
        }
        ReviewRole::Qa => {
            "a QA lead; judge testability, acceptance criteria, edge cases and failure handling"
        }
    };
    format!("You are {lens}. Provide a concise, actionable review as a Markdown bullet list.")
}

pub fn reviewer(prd: &str) -> String {
    format!(
        "Review the following PRD. List concrete problems and concrete improvements; \
         do not rewrite the document.\n\n---\n{prd}\n"
    )
}

pub fn pm_revise(
    requirement: &str,
    prd: &str,
    reviews: &BTreeMap<ReviewRole, String>,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Revise the PRD below, addressing every review point that improves the document. \
         Output only the revised PRD in Markdown.\n\n\
         Original requirement:\n{requirement}\n\n\
         Current PRD:\n---\n{prd}\n---\n\nReviews:\n"
    );
    for (role, review) in reviews {
        prompt.push_str(&format!("\n## {}\n{review}\n", role.heading()));
    }
    if let Some(text) = feedback {
        prompt.push_str(&format!(
            "\nHuman feedback (takes precedence over reviews):\n{text}\n"
        ));
    }
    prompt
}

pub fn architect(prd: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Produce a technical design and a task breakdown for the PRD below.\n\n\
         Output format:\n\
         1. A Markdown design document (architecture, components, data model).\n\
         2. A fenced ```json code block containing the task array. Each task object has:\n\
            \"id\" (task_001, task_002, ...), \"title\", \"description\", \
            \"dependencies\" (array of task ids), \"status\" (always \"pending\"), \
            \"priority\" (integer, higher runs first).\n\
         Tasks must be small enough for one focused coding session and their \
         dependencies must form no cycles.\n\n\
         PRD:\n---\n{prd}\n---\n"
    );
    if let Some(text) = feedback {
        prompt.push_str(&format!(
            "\nHuman feedback on the previous design (takes precedence):\n{text}\n"
        ));
    }
    prompt
}

pub fn coder(prd: &str, design: &str, task: &TaskRecord) -> String {
    format!(
        "You are implementing one task of a larger project in the current directory.\n\n\
         Project PRD:\n---\n{prd}\n---\n\n\
         Technical design:\n---\n{design}\n---\n\n\
         Current task ({id}): {title}\n{description}\n\n\
         Implement exactly this task. Create or modify files as needed and state \
         what you changed when you are done.",
        id = task.id,
        title = task.title,
        description = task.description,
    )
}
