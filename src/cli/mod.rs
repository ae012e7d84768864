//! Command-line interface.
//!
//! Subcommands map onto the engine's lifecycle: `start` creates and drives
//! a session, `continue` resumes a checkpoint (optionally routing feedback
//! back to the producing agent), `status`/`show`/`list-sessions` are
//! strictly read-only.

pub mod args;
pub mod commands;

pub use args::{Args, ArtifactKind, Commands};
