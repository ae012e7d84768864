//! Durable checkpoint store.
//!
//! One JSON record per session under `<DATA_ROOT>/checkpoints/`, written
//! after every node completion with a temp-file-then-rename commit so a
//! crash never leaves a torn checkpoint. Records carry an explicit format
//! version; a newer version on disk refuses to load rather than
//! misinterpreting state.

use crate::env;
use crate::error::{EngineError, Result};
use crate::state::{SessionState, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Current checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// The persisted snapshot of one session: the unit of resumability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version tag for forward compatibility
    pub version: u32,
    pub session_id: String,
    /// Node the engine will execute next when resumed
    pub next_node: String,
    /// True when the run stopped at an interrupt point (as opposed to
    /// completing or failing)
    pub interrupted: bool,
    pub saved_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Checkpoint {
    pub fn new(state: SessionState, next_node: impl Into<String>, interrupted: bool) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            session_id: state.session_id.clone(),
            next_node: next_node.into(),
            interrupted,
            saved_at: Utc::now(),
            state,
        }
    }
}

/// Summary row for `list-sessions`
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
}

/// Key/value store mapping `session_id` to its serialized checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(data_root: &std::path::Path) -> Self {
        Self {
            dir: env::checkpoints_dir_path(data_root),
        }
    }

    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Persist a checkpoint atomically (write-then-rename).
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.init().await?;
        let path = self.path_for(&checkpoint.session_id);
        let json = serde_json::to_string_pretty(checkpoint)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(
            session_id = %checkpoint.session_id,
            next_node = %checkpoint.next_node,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Load a session checkpoint, refusing schema versions newer than this
    /// build understands.
    pub async fn load(&self, session_id: &str) -> Result<Checkpoint> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Err(EngineError::State(format!("unknown session '{session_id}'")));
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let checkpoint: Checkpoint = serde_json::from_str(&content).map_err(|e| {
            EngineError::State(format!("corrupt checkpoint for session '{session_id}': {e}"))
        })?;
        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(EngineError::State(format!(
                "checkpoint for session '{session_id}' has version {} but this build supports up to {}",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }

    /// Enumerate stored sessions, newest first.
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        if !self.dir.exists() {
            return Ok(summaries);
        }
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(session_id) = name.strip_suffix(".json") else {
                continue;
            };
            match self.load(session_id).await {
                Ok(checkpoint) => summaries.push(SessionSummary {
                    session_id: checkpoint.session_id,
                    stage: checkpoint.state.stage,
                    created_at: checkpoint.state.created_at,
                }),
                Err(e) => warn!(session_id, "skipping unreadable checkpoint: {e}"),
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
