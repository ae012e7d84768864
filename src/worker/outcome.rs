//! Worker outcome classification.
//!
//! The coding CLI emits free-form text; success is decided by exit code,
//! timeout, and case-insensitive marker substrings. Strict mode demands an
//! explicit completion marker; lenient mode only fails on an explicit
//! failure marker.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Completion markers required by strict mode
pub const DEFAULT_SUCCESS_MARKERS: &[&str] = &["done", "completed", "created file", "wrote"];

/// Failure markers that sink an otherwise clean run in lenient mode
pub const DEFAULT_FAILURE_MARKERS: &[&str] = &["error", "failed", "cannot"];

/// Classification strictness for worker output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Exit 0 succeeds unless an explicit failure marker appears
    Lenient,
    /// Exit 0 succeeds only when an explicit completion marker appears
    Strict,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(ValidationMode::Lenient),
            "strict" => Ok(ValidationMode::Strict),
            other => Err(format!(
                "invalid validation mode '{other}', expected 'lenient' or 'strict'"
            )),
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMode::Lenient => write!(f, "lenient"),
            ValidationMode::Strict => write!(f, "strict"),
        }
    }
}

/// Why a worker invocation was classified as a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NonzeroExit,
    Timeout,
    /// Strict mode: exit 0 without a completion marker
    AmbiguousOutput,
    /// Lenient mode: exit 0 with an explicit failure marker
    FailureMarker,
    SpawnFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NonzeroExit => "nonzero_exit",
            FailureReason::Timeout => "timeout",
            FailureReason::AmbiguousOutput => "ambiguous_output",
            FailureReason::FailureMarker => "failure_marker",
            FailureReason::SpawnFailed => "spawn_failed",
        }
    }
}

/// Result of one worker invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// None when the process was killed (timeout) or never spawned
    pub exit_code: Option<i32>,
    /// Wall-clock seconds
    pub elapsed: f64,
    pub reason: Option<FailureReason>,
}

impl WorkerOutcome {
    /// Short description for task error records
    pub fn reason_label(&self) -> String {
        match self.reason {
            Some(reason) => reason.as_str().to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Case-insensitive marker substrings used for classification
#[derive(Debug, Clone)]
pub struct MarkerSet {
    success: Vec<String>,
    failure: Vec<String>,
}

impl MarkerSet {
    pub fn new<S: AsRef<str>>(success: &[S], failure: &[S]) -> Self {
        let lower = |items: &[S]| {
            items
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            success: lower(success),
            failure: lower(failure),
        }
    }

    /// Parse a comma-separated override, falling back to the defaults when
    /// the value is absent.
    pub fn from_overrides(success: Option<&str>, failure: Option<&str>) -> Self {
        let split = |value: Option<&str>, defaults: &[&str]| -> Vec<String> {
            match value {
                Some(csv) => csv
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => defaults.iter().map(|s| s.to_string()).collect(),
            }
        };
        Self {
            success: split(success, DEFAULT_SUCCESS_MARKERS),
            failure: split(failure, DEFAULT_FAILURE_MARKERS),
        }
    }

    fn any_success(&self, haystack: &str) -> bool {
        self.success.iter().any(|m| haystack.contains(m))
    }

    fn any_failure(&self, haystack: &str) -> bool {
        self.failure.iter().any(|m| haystack.contains(m))
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::from_overrides(None, None)
    }
}

/// Classify a finished (or timed-out) worker invocation.
pub fn classify(
    exit_code: Option<i32>,
    timed_out: bool,
    stdout: &str,
    mode: ValidationMode,
    markers: &MarkerSet,
) -> (bool, Option<FailureReason>) {
    if timed_out {
        return (false, Some(FailureReason::Timeout));
    }
    match exit_code {
        Some(0) => {}
        _ => return (false, Some(FailureReason::NonzeroExit)),
    }

    let haystack = stdout.to_lowercase();
    match mode {
        ValidationMode::Strict => {
            if markers.any_success(&haystack) {
                (true, None)
            } else {
                (false, Some(FailureReason::AmbiguousOutput))
            }
        }
        ValidationMode::Lenient => {
            if markers.any_failure(&haystack) {
                (false, Some(FailureReason::FailureMarker))
            } else {
                (true, None)
            }
        }
    }
}
