//! Engine error types.
//!
//! Domain errors are typed with `thiserror` and caught exactly once by the
//! workflow engine: a node failure is converted into a serializable
//! [`ErrorRecord`], stored in session state, checkpointed, and surfaced as a
//! failed run. Everything outside a node aborts the process with a non-zero
//! exit code.

use serde::{Deserialize, Serialize};

/// Convenience alias used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing API key, unusable paths, malformed settings. Fails fast
    /// before any node runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// A planner LLM call failed or produced empty output
    #[error("planner call failed: {0}")]
    Llm(String),

    /// The coding worker could not be spawned or managed
    #[error("worker error: {0}")]
    Worker(String),

    /// The architect produced a malformed task list
    #[error("task list validation failed: {0}")]
    Validation(String),

    /// Checkpoint schema mismatch, invariant violation or path escape
    #[error("session state error: {0}")]
    State(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable kind identifier used in error records and user output
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::Llm(_) => "llm",
            EngineError::Worker(_) => "worker",
            EngineError::Validation(_) => "validation",
            EngineError::State(_) => "state",
            EngineError::Io(_) => "io",
            EngineError::Serde(_) => "serde",
        }
    }

    /// Convert into a serializable record attributed to the node that failed
    pub fn to_record(&self, node: &str) -> ErrorRecord {
        ErrorRecord {
            kind: self.kind().to_string(),
            message: self.to_string(),
            node: Some(node.to_string()),
        }
    }
}

/// Serializable form of the most recent failure, carried in session state
/// as `last_error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stable error kind (`config`, `llm`, `validation`, `iteration_cap`, ...)
    pub kind: String,
    /// One-sentence human-readable explanation
    pub message: String,
    /// Node that was executing when the error occurred
    pub node: Option<String>,
}

impl ErrorRecord {
    /// Record for a run terminated by the coding iteration cap
    pub fn iteration_cap(iterations: u32, max: u32) -> Self {
        Self {
            kind: "iteration_cap".to_string(),
            message: format!(
                "coding loop reached the iteration cap ({iterations}/{max}) with pending tasks remaining"
            ),
            node: Some("coder".to_string()),
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node {
            Some(node) => write!(f, "[{}] {} (node: {})", self.kind, self.message, node),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
