//! Per-session filesystem artifact store.
//!
//! All planner artifacts (PRD, reviews, design, task list) live under the
//! session workspace. Writes create parent directories, JSON artifacts are
//! written atomically (temp file + rename), and every path is confined to
//! the workspace root. Generated code is the one exception: it goes to the
//! explicitly configured project directory.

use crate::error::{EngineError, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Read/write primitives rooted at one session's workspace.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the workspace scaffolding (root and log directories)
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(crate::env::worker_logs_dir_path(&self.root)).await?;
        Ok(())
    }

    /// Resolve a workspace-relative path, rejecting anything that would
    /// escape the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return Err(EngineError::State(format!(
                "artifact path '{relative}' must be workspace-relative"
            )));
        }
        for component in candidate.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(EngineError::State(format!(
                        "artifact path '{relative}' escapes the workspace"
                    )));
                }
            }
        }
        Ok(self.root.join(candidate))
    }

    /// Write a UTF-8 text artifact, creating parent directories.
    pub async fn write_text(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content.as_bytes()).await?;
        Ok(path)
    }

    /// Read a UTF-8 text artifact.
    pub async fn read_text(&self, relative: &str) -> Result<String> {
        let path = self.resolve(relative)?;
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    /// Serialize a JSON artifact atomically: write to a temp file in the
    /// same directory, then rename over the destination.
    pub async fn write_json_atomic<T: Serialize>(
        &self,
        relative: &str,
        value: &T,
    ) -> Result<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }
}
