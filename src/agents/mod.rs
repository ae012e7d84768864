//! Workflow agents.
//!
//! Planner agents (PM, reviewers, architect) are stateless functions from
//! a state subset through a prompt template and an LLM call to artifact
//! files plus a state patch. The coder agent is the iterative node that
//! advances the task list by invoking the worker CLI.

pub mod architect;
pub mod coder;
pub mod pm;
pub mod prompts;
pub mod reviewers;


pub use architect::ArchitectNode;
pub use coder::CoderNode;
pub use pm::{PmDraftNode, PmReviseNode};
pub use reviewers::ReviewerNode;
