//! Command line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "autodev")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-agent development orchestrator: PRD, reviews, design and coding driven by LLM agents")]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a session and run it until completion or the next interrupt
    Start {
        /// The requirement to build
        requirement: String,
        /// Pause for human review before the design and coding phases
        #[arg(long = "human-loop")]
        human_loop: bool,
        /// Existing directory generated code is written to
        /// (default: <workspace>/code)
        #[arg(long = "project-dir")]
        project_dir: Option<PathBuf>,
        /// Run the whole coding loop without the pre-coding pause
        #[arg(long = "batch-coding")]
        batch_coding: bool,
    },
    /// Resume a session from its checkpoint.
    ///
    /// Feedback re-runs the agent that produced the artifact under review
    /// (the PRD revision when paused before design, the architect when
    /// paused before coding), not the phase about to start.
    #[command(name = "continue")]
    Continue {
        session_id: String,
        /// Human feedback for the most recent artifact
        #[arg(long = "feedback")]
        feedback: Option<String>,
    },
    /// Print the session stage, task counts and last error
    Status { session_id: String },
    /// Print an artifact file
    Show {
        session_id: String,
        #[arg(long = "artifact", value_enum)]
        artifact: ArtifactKind,
    },
    /// List stored sessions
    ListSessions,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArtifactKind {
    Prd,
    Design,
    Tasks,
}
