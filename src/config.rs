//! Engine configuration.
//!
//! Settings come from environment variables first, with an optional TOML
//! file underlay at `<DATA_ROOT>/config.toml` for anything not set in the
//! environment. Configuration problems fail fast, before any node runs.

use crate::env::vars;
use crate::error::{EngineError, Result};
use crate::worker::{MarkerSet, ValidationMode, WorkerConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_DATA_ROOT: &str = ".autodev";
const DEFAULT_MAX_CODING_ITERATIONS: u32 = 50;
const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 300;

/// Resolved engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub pm_model: Option<String>,
    pub architect_model: Option<String>,
    pub coder_model: Option<String>,
    pub workspace_root: PathBuf,
    pub data_root: PathBuf,
    pub max_coding_iterations: u32,
    pub human_in_loop: bool,
    pub worker_binary: String,
    pub worker_timeout: Duration,
    pub validation_mode: ValidationMode,
    pub success_markers: Option<String>,
    pub failure_markers: Option<String>,
}

/// Optional file underlay; every field may be omitted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub pm_model: Option<String>,
    pub architect_model: Option<String>,
    pub coder_model: Option<String>,
    pub workspace_root: Option<PathBuf>,
    pub max_coding_iterations: Option<u32>,
    pub human_in_loop: Option<bool>,
    pub worker_binary: Option<String>,
    pub claude_cli_timeout: Option<u64>,
    pub validation_mode: Option<String>,
    pub success_markers: Option<String>,
    pub failure_markers: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Resolve configuration from the environment with the file underlay.
    pub fn load() -> Result<Self> {
        let data_root = env_var(vars::DATA_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));

        let file = Self::load_file(&data_root)?;

        let base_url = env_var(vars::ANTHROPIC_BASE_URL)
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            EngineError::Config(format!("invalid {}: {e}", vars::ANTHROPIC_BASE_URL))
        })?;

        let max_coding_iterations = match env_var(vars::MAX_CODING_ITERATIONS) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                EngineError::Config(format!(
                    "{} must be a positive integer, got '{raw}'",
                    vars::MAX_CODING_ITERATIONS
                ))
            })?,
            None => file
                .max_coding_iterations
                .unwrap_or(DEFAULT_MAX_CODING_ITERATIONS),
        };

        let worker_timeout_secs = match env_var(vars::CLAUDE_CLI_TIMEOUT) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                EngineError::Config(format!(
                    "{} must be a number of seconds, got '{raw}'",
                    vars::CLAUDE_CLI_TIMEOUT
                ))
            })?,
            None => file
                .claude_cli_timeout
                .unwrap_or(DEFAULT_WORKER_TIMEOUT_SECS),
        };

        let validation_mode = match env_var(vars::CLAUDE_CLI_VALIDATION_MODE)
            .or(file.validation_mode)
        {
            Some(raw) => raw
                .parse::<ValidationMode>()
                .map_err(EngineError::Config)?,
            None => ValidationMode::Lenient,
        };

        let workspace_root = env_var(vars::WORKSPACE_ROOT)
            .map(PathBuf::from)
            .or(file.workspace_root)
            .unwrap_or_else(|| data_root.join("workspaces"));

        Ok(Self {
            api_key: env_var(vars::ANTHROPIC_API_KEY).or(file.api_key),
            base_url,
            default_model: env_var(vars::DEFAULT_MODEL)
                .or(file.default_model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pm_model: env_var(vars::PM_MODEL).or(file.pm_model),
            architect_model: env_var(vars::ARCHITECT_MODEL).or(file.architect_model),
            coder_model: env_var(vars::CODER_MODEL).or(file.coder_model),
            workspace_root,
            data_root,
            max_coding_iterations,
            human_in_loop: env_var(vars::HUMAN_IN_LOOP)
                .map(|v| parse_bool(&v))
                .or(file.human_in_loop)
                .unwrap_or(false),
            worker_binary: env_var(vars::CLAUDE_CLI_BINARY)
                .or(file.worker_binary)
                .unwrap_or_else(|| "claude".to_string()),
            worker_timeout: Duration::from_secs(worker_timeout_secs),
            validation_mode,
            success_markers: env_var(vars::CLAUDE_CLI_SUCCESS_MARKERS).or(file.success_markers),
            failure_markers: env_var(vars::CLAUDE_CLI_FAILURE_MARKERS).or(file.failure_markers),
        })
    }

    fn load_file(data_root: &std::path::Path) -> Result<FileConfig> {
        let path = crate::env::config_file_path(data_root);
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        debug!("loading configuration underlay from {}", path.display());
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("malformed {}: {e}", path.display())))
    }

    /// Model for the given planner role, falling back to the default model.
    pub fn planner_model(&self, role: PlannerRole) -> &str {
        let override_model = match role {
            PlannerRole::Pm => self.pm_model.as_deref(),
            PlannerRole::Architect => self.architect_model.as_deref(),
            PlannerRole::Reviewer => None,
        };
        override_model.unwrap_or(&self.default_model)
    }

    /// Planner agents need an API key; fail fast when it is missing.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            EngineError::Config(format!(
                "{} is not set; planner agents cannot run without it",
                vars::ANTHROPIC_API_KEY
            ))
        })
    }

    /// Fail fast when the coding CLI is not on `PATH`.
    pub fn require_worker_binary(&self) -> Result<PathBuf> {
        which::which(&self.worker_binary).map_err(|_| {
            EngineError::Config(format!(
                "coding CLI '{}' not found on PATH",
                self.worker_binary
            ))
        })
    }

    /// Create the workspace and data roots.
    pub fn ensure_roots(&self) -> Result<()> {
        std::fs::create_dir_all(&self.workspace_root).map_err(|e| {
            EngineError::Config(format!(
                "cannot create workspace root {}: {e}",
                self.workspace_root.display()
            ))
        })?;
        std::fs::create_dir_all(&self.data_root).map_err(|e| {
            EngineError::Config(format!(
                "cannot create data root {}: {e}",
                self.data_root.display()
            ))
        })?;
        Ok(())
    }

    /// Assemble the worker adapter configuration.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            binary: self.worker_binary.clone(),
            permission_mode: "acceptEdits".to_string(),
            model: self.coder_model.clone(),
            timeout: self.worker_timeout,
            validation_mode: self.validation_mode,
            markers: MarkerSet::from_overrides(
                self.success_markers.as_deref(),
                self.failure_markers.as_deref(),
            ),
            max_capture_bytes: 1024 * 1024,
        }
    }
}

/// Planner roles with model overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerRole {
    Pm,
    Reviewer,
    Architect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::vars;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            vars::ANTHROPIC_API_KEY,
            vars::ANTHROPIC_BASE_URL,
            vars::DEFAULT_MODEL,
            vars::PM_MODEL,
            vars::ARCHITECT_MODEL,
            vars::CODER_MODEL,
            vars::WORKSPACE_ROOT,
            vars::DATA_ROOT,
            vars::MAX_CODING_ITERATIONS,
            vars::HUMAN_IN_LOOP,
            vars::CLAUDE_CLI_TIMEOUT,
            vars::CLAUDE_CLI_VALIDATION_MODE,
            vars::CLAUDE_CLI_SUCCESS_MARKERS,
            vars::CLAUDE_CLI_FAILURE_MARKERS,
        ] {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::load().unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.max_coding_iterations, 50);
        assert_eq!(config.worker_timeout, Duration::from_secs(300));
        assert_eq!(config.validation_mode, ValidationMode::Lenient);
        assert!(!config.human_in_loop);
        assert!(config.api_key.is_none());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var(vars::ANTHROPIC_API_KEY, "sk-test");
            std::env::set_var(vars::MAX_CODING_ITERATIONS, "7");
            std::env::set_var(vars::CLAUDE_CLI_VALIDATION_MODE, "strict");
            std::env::set_var(vars::HUMAN_IN_LOOP, "true");
            std::env::set_var(vars::PM_MODEL, "claude-opus-4-1");
        }

        let config = Config::load().unwrap();
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.max_coding_iterations, 7);
        assert_eq!(config.validation_mode, ValidationMode::Strict);
        assert!(config.human_in_loop);
        assert_eq!(config.planner_model(PlannerRole::Pm), "claude-opus-4-1");
        assert_eq!(config.planner_model(PlannerRole::Reviewer), DEFAULT_MODEL);
        assert_eq!(config.planner_model(PlannerRole::Architect), DEFAULT_MODEL);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fail_fast() {
        clear_env();
        unsafe { std::env::set_var(vars::MAX_CODING_ITERATIONS, "lots") };
        assert!(Config::load().is_err());
        clear_env();

        unsafe { std::env::set_var(vars::CLAUDE_CLI_VALIDATION_MODE, "medium") };
        assert!(Config::load().is_err());
        clear_env();

        unsafe { std::env::set_var(vars::ANTHROPIC_BASE_URL, "not a url") };
        assert!(Config::load().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_file_underlay_env_wins() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "default_model = \"claude-haiku-4-5\"\nmax_coding_iterations = 9\n",
        )
        .unwrap();
        unsafe {
            std::env::set_var(vars::DATA_ROOT, dir.path());
            std::env::set_var(vars::MAX_CODING_ITERATIONS, "3");
        }

        let config = Config::load().unwrap();
        // file fills the gap, env wins the conflict
        assert_eq!(config.default_model, "claude-haiku-4-5");
        assert_eq!(config.max_coding_iterations, 3);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_workspace_root_defaults_under_data_root() {
        clear_env();
        unsafe { std::env::set_var(vars::DATA_ROOT, "/var/lib/autodev") };
        let config = Config::load().unwrap();
        assert_eq!(
            config.workspace_root,
            PathBuf::from("/var/lib/autodev/workspaces")
        );
        clear_env();
    }
}
