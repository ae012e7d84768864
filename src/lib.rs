//! # AutoDev
//!
//! A multi-agent orchestration system that drives a fixed software
//! development workflow: requirement analysis, PRD drafting, multi-reviewer
//! critique, technical design, task decomposition and an iterative coding
//! loop, coordinating LLM planner agents with the Claude Code CLI as an
//! external coding worker.
//!
//! ## Architecture Overview
//!
//! The core is a durable, checkpointed workflow engine. A directed graph of
//! nodes operates on a shared session state; every node completion writes a
//! checkpoint, and designated interrupt points let a human review artifacts
//! before the design and coding phases. A resumed session continues from
//! exactly the node that was about to run, or re-enters the producing agent
//! when feedback is supplied.
//!
//! - **[`workflow`]**: minimal graph engine (node registry, predicate edges,
//!   interrupt markers) and the AutoDev graph wiring
//! - **[`agents`]**: planner agents (PM, three reviewers, architect) and the
//!   iterative coder node
//! - **[`worker`]**: Claude Code CLI child-process adapter with strict and
//!   lenient outcome classification
//! - **[`llm`]**: planner model seam and the Anthropic Messages API client
//! - **[`task`]**: task records and the crash-safe `tasks.json` list
//! - **[`state`]** / **[`checkpoint`]**: session state, typed patches and
//!   the durable checkpoint store
//! - **[`artifacts`]**: workspace-confined artifact I/O
//! - **[`cli`]**: command surface (`start`, `continue`, `status`, `show`,
//!   `list-sessions`)
//!
//! ## Quick Start
//!
//! ```bash
//! export ANTHROPIC_API_KEY=sk-ant-...
//! autodev start "Build a counter with inc/dec/reset" --human-loop
//! autodev continue <session_id> --feedback "Use SQLite not JSON"
//! ```

pub mod agents;
pub mod artifacts;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod llm;
pub mod state;
pub mod task;
pub mod worker;
pub mod workflow;

// Re-export the main engine types
pub use checkpoint::{Checkpoint, CheckpointStore, SessionSummary};
pub use config::{Config, PlannerRole};
pub use error::{EngineError, ErrorRecord};
pub use state::{ReviewRole, SessionState, Stage, StatePatch};
pub use task::{TaskList, TaskRecord, TaskStatus};

// Re-export the collaborator seams
pub use llm::{AnthropicPlanner, CompletionRequest, CompletionResponse, LlmError, PlannerModel};
pub use worker::{
    ClaudeCliWorker, FailureReason, TaskWorker, ValidationMode, WorkerConfig, WorkerInvocation,
    WorkerOutcome,
};
pub use workflow::{Engine, GraphDeps, RunOutcome, RunStatus, Workflow, build_workflow};
