//! Coding worker adapter.
//!
//! The worker is the external Claude Code CLI, spawned as a child process
//! per task. This module is the only place that touches the child process;
//! everything else sees [`TaskWorker`] as a pure function from an
//! invocation to a classified [`WorkerOutcome`].

pub mod adapter;
pub mod outcome;


pub use adapter::{ClaudeCliWorker, TaskWorker, WorkerConfig, WorkerInvocation};
pub use outcome::{FailureReason, MarkerSet, ValidationMode, WorkerOutcome, classify};
