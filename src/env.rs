//! Environment variable names and path utilities.
//!
//! This module centralizes the environment variable names and on-disk
//! layout used throughout the application, making them easier to maintain
//! and modify.

use std::path::{Path, PathBuf};

/// Configuration file name inside the data root
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable names
pub mod vars {
    /// API key for the Anthropic Messages API (required for planner agents)
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

    /// Base URL override for the Anthropic Messages API
    pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";

    /// Model used by planner agents when no role-specific override is set
    pub const DEFAULT_MODEL: &str = "DEFAULT_MODEL";

    /// Model override for the product-manager agent
    pub const PM_MODEL: &str = "PM_MODEL";

    /// Model override for the architect agent
    pub const ARCHITECT_MODEL: &str = "ARCHITECT_MODEL";

    /// Model forwarded to the coding CLI via `--model`
    pub const CODER_MODEL: &str = "CODER_MODEL";

    /// Root directory for per-session artifact workspaces
    pub const WORKSPACE_ROOT: &str = "WORKSPACE_ROOT";

    /// Root directory for engine data (checkpoints, config file)
    pub const DATA_ROOT: &str = "DATA_ROOT";

    /// Upper bound on coder-loop iterations per session
    pub const MAX_CODING_ITERATIONS: &str = "MAX_CODING_ITERATIONS";

    /// Default for the `--human-loop` flag
    pub const HUMAN_IN_LOOP: &str = "HUMAN_IN_LOOP";

    /// Coding CLI binary name or path (default `claude`)
    pub const CLAUDE_CLI_BINARY: &str = "CLAUDE_CLI_BINARY";

    /// Wall-clock timeout (seconds) for one coding CLI invocation
    pub const CLAUDE_CLI_TIMEOUT: &str = "CLAUDE_CLI_TIMEOUT";

    /// Worker output classification strictness: `lenient` or `strict`
    pub const CLAUDE_CLI_VALIDATION_MODE: &str = "CLAUDE_CLI_VALIDATION_MODE";

    /// Comma-separated override for the strict-mode completion markers
    pub const CLAUDE_CLI_SUCCESS_MARKERS: &str = "CLAUDE_CLI_SUCCESS_MARKERS";

    /// Comma-separated override for the lenient-mode failure markers
    pub const CLAUDE_CLI_FAILURE_MARKERS: &str = "CLAUDE_CLI_FAILURE_MARKERS";

    /// Tracing filter directive (e.g. `info`, `autodev=debug`)
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// Artifact file and directory names within a session workspace
pub mod artifacts {
    /// Product requirements document
    pub const PRD_FILE_NAME: &str = "PRD.md";

    /// Concatenated reviewer feedback with role headers
    pub const REVIEWS_FILE_NAME: &str = "PRD_Reviews.md";

    /// Technical design document
    pub const DESIGN_FILE_NAME: &str = "Design.md";

    /// Ordered task list
    pub const TASKS_FILE_NAME: &str = "tasks.json";

    /// Generated code directory when no external project dir is configured
    pub const CODE_DIR_NAME: &str = "code";

    /// Session log directory
    pub const LOGS_DIR_NAME: &str = "logs";

    /// Worker subprocess audit logs under the log directory
    pub const WORKER_LOGS_DIR_NAME: &str = "worker";
}

/// Checkpoints directory name within the data root
pub const CHECKPOINTS_DIR_NAME: &str = "checkpoints";

/// Build a session workspace path from the workspace root
pub fn session_workspace_path(workspace_root: &Path, session_id: &str) -> PathBuf {
    workspace_root.join(session_id)
}

/// Build the generated-code directory path within a session workspace
pub fn code_dir_path(workspace: &Path) -> PathBuf {
    workspace.join(artifacts::CODE_DIR_NAME)
}

/// Build the worker audit-log directory path within a session workspace
pub fn worker_logs_dir_path(workspace: &Path) -> PathBuf {
    workspace
        .join(artifacts::LOGS_DIR_NAME)
        .join(artifacts::WORKER_LOGS_DIR_NAME)
}

/// Build the checkpoints directory path from the data root
pub fn checkpoints_dir_path(data_root: &Path) -> PathBuf {
    data_root.join(CHECKPOINTS_DIR_NAME)
}

/// Build a checkpoint file path for a session
pub fn checkpoint_file_path(data_root: &Path, session_id: &str) -> PathBuf {
    checkpoints_dir_path(data_root).join(format!("{session_id}.json"))
}

/// Build the optional configuration file path within the data root
pub fn config_file_path(data_root: &Path) -> PathBuf {
    data_root.join(CONFIG_FILE_NAME)
}
