//! Session state carried through the workflow graph.
//!
//! A single [`SessionState`] record flows through every node. Nodes never
//! mutate it directly; they return a [`StatePatch`] which the engine merges
//! and checkpoints. Reviewer fan-out relies on patches touching disjoint
//! keys, so merge order does not affect the result.

use crate::error::ErrorRecord;
use crate::task::TaskRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Coarse workflow phase, recorded in state and used for routing and the
/// `status` display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PmDraft,
    PmReview,
    PmRevise,
    Architect,
    Coding,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::PmDraft => "pm_draft",
            Stage::PmReview => "pm_review",
            Stage::PmRevise => "pm_revise",
            Stage::Architect => "architect",
            Stage::Coding => "coding",
            Stage::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Reviewer perspective in the PRD critique fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRole {
    Pm,
    Dev,
    Qa,
}

impl ReviewRole {
    pub const ALL: [ReviewRole; 3] = [ReviewRole::Pm, ReviewRole::Dev, ReviewRole::Qa];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewRole::Pm => "pm",
            ReviewRole::Dev => "dev",
            ReviewRole::Qa => "qa",
        }
    }

    /// Heading used in the `PRD_Reviews.md` audit file
    pub fn heading(&self) -> &'static str {
        match self {
            ReviewRole::Pm => "Product Review",
            ReviewRole::Dev => "Engineering Review",
            ReviewRole::Qa => "QA Review",
        }
    }
}

/// Complete session state: the unit of checkpointing and resumability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Stable identifier, checkpoint key and workspace subdirectory name
    pub session_id: String,
    /// Immutable original user requirement
    pub requirement: String,
    /// Absolute path of the per-session artifact root
    pub workspace_path: PathBuf,
    /// External directory generated code is written to; defaults to
    /// `workspace_path/code` when unset
    pub project_dir: Option<PathBuf>,
    /// Whether interrupt points fire before architect and coder
    pub human_in_loop: bool,
    /// Suppress the pre-coder interrupt even when `human_in_loop` is set
    pub batch_coding: bool,
    pub stage: Stage,
    pub prd_path: Option<PathBuf>,
    pub design_path: Option<PathBuf>,
    pub tasks_path: Option<PathBuf>,
    pub reviews_path: Option<PathBuf>,
    /// Reviewer output keyed by role; populated by the review fan-out
    #[serde(default)]
    pub reviews: BTreeMap<ReviewRole, String>,
    /// Human feedback injected on resume; consumed by the next producer
    /// node and then cleared
    pub feedback: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    /// Count of settled tasks; non-decreasing across the coding loop
    #[serde(default)]
    pub current_task_index: usize,
    /// Coder-loop invocations so far; guards against runaway loops
    #[serde(default)]
    pub iterations: u32,
    pub last_error: Option<ErrorRecord>,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        session_id: impl Into<String>,
        requirement: impl Into<String>,
        workspace_path: PathBuf,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            requirement: requirement.into(),
            workspace_path,
            project_dir: None,
            human_in_loop: false,
            batch_coding: false,
            stage: Stage::PmDraft,
            prd_path: None,
            design_path: None,
            tasks_path: None,
            reviews_path: None,
            reviews: BTreeMap::new(),
            feedback: None,
            tasks: Vec::new(),
            current_task_index: 0,
            iterations: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    /// Directory generated code is written to
    pub fn code_dir(&self) -> PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| crate::env::code_dir_path(&self.workspace_path))
    }

    /// Merge a node's partial update into the state
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(path) = patch.prd_path {
            self.prd_path = Some(path);
        }
        if let Some(path) = patch.design_path {
            self.design_path = Some(path);
        }
        if let Some(path) = patch.tasks_path {
            self.tasks_path = Some(path);
        }
        if let Some(path) = patch.reviews_path {
            self.reviews_path = Some(path);
        }
        for (role, text) in patch.reviews {
            self.reviews.insert(role, text);
        }
        if let Some(tasks) = patch.tasks {
            self.tasks = tasks;
        }
        if let Some(index) = patch.current_task_index {
            self.current_task_index = index;
        }
        if let Some(iterations) = patch.iterations {
            self.iterations = iterations;
        }
        if patch.clear_feedback {
            self.feedback = None;
        }
        if patch.clear_last_error {
            self.last_error = None;
        }
        if let Some(record) = patch.last_error {
            self.last_error = Some(record);
        }
    }
}

/// Typed partial state update returned by a node. Only the fields a node
/// sets are merged; reviewer patches carry a single map entry each.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub prd_path: Option<PathBuf>,
    pub design_path: Option<PathBuf>,
    pub tasks_path: Option<PathBuf>,
    pub reviews_path: Option<PathBuf>,
    pub reviews: BTreeMap<ReviewRole, String>,
    pub tasks: Option<Vec<TaskRecord>>,
    pub current_task_index: Option<usize>,
    pub iterations: Option<u32>,
    pub clear_feedback: bool,
    pub last_error: Option<ErrorRecord>,
    pub clear_last_error: bool,
}

impl StatePatch {
    pub fn review(role: ReviewRole, text: String) -> Self {
        let mut patch = Self::default();
        patch.reviews.insert(role, text);
        patch
    }
}
