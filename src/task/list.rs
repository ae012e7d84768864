//! Ordered task list with on-disk persistence and eligibility selection.

use crate::error::{EngineError, Result};
use crate::task::types::{TaskRecord, TaskStatus};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

/// The ordered task list for one session, mirroring `tasks.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskList {
    records: Vec<TaskRecord>,
}

impl TaskList {
    pub fn new(records: Vec<TaskRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TaskRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TaskRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TaskRecord> {
        self.records.get_mut(index)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|t| t.id == id)
    }

    /// Validate a freshly created task list: unique ids, dependencies that
    /// refer to declared ids, no self-dependencies, no cycles, and a
    /// uniformly `pending` status.
    pub fn validate_new(records: &[TaskRecord]) -> Result<()> {
        let mut ids = HashSet::new();
        for task in records {
            if task.id.trim().is_empty() {
                return Err(EngineError::Validation("task with empty id".to_string()));
            }
            if !ids.insert(task.id.as_str()) {
                return Err(EngineError::Validation(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
            if task.status != TaskStatus::Pending {
                return Err(EngineError::Validation(format!(
                    "task '{}' created with status '{}', expected 'pending'",
                    task.id, task.status
                )));
            }
        }

        for task in records {
            for dep in &task.dependencies {
                if dep == &task.id {
                    return Err(EngineError::Validation(format!(
                        "task '{}' depends on itself",
                        task.id
                    )));
                }
                if !ids.contains(dep.as_str()) {
                    return Err(EngineError::Validation(format!(
                        "task '{}' depends on unknown task '{}'",
                        task.id, dep
                    )));
                }
            }
        }

        Self::check_cycles(records)?;
        Ok(())
    }

    /// Depth-first cycle check over the dependency edges
    fn check_cycles(records: &[TaskRecord]) -> Result<()> {
        let by_id: HashMap<&str, &TaskRecord> =
            records.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut settled: HashSet<&str> = HashSet::new();

        for task in records {
            if settled.contains(task.id.as_str()) {
                continue;
            }
            // stack entries: (task id, next dependency index)
            let mut stack: Vec<(&str, usize)> = vec![(task.id.as_str(), 0)];
            let mut on_path: HashSet<&str> = HashSet::from([task.id.as_str()]);

            while let Some((id, dep_idx)) = stack.pop() {
                let deps = &by_id[id].dependencies;
                if dep_idx >= deps.len() {
                    on_path.remove(id);
                    settled.insert(id);
                    continue;
                }
                stack.push((id, dep_idx + 1));
                let dep = deps[dep_idx].as_str();
                if settled.contains(dep) {
                    continue;
                }
                if !on_path.insert(dep) {
                    return Err(EngineError::Validation(format!(
                        "dependency cycle involving task '{dep}'"
                    )));
                }
                stack.push((dep, 0));
            }
        }
        Ok(())
    }

    /// Select the next task to attempt: the highest-priority `pending` task
    /// whose dependencies are all `completed`. Ties break by array order.
    pub fn select_next(&self) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (index, task) in self.records.iter().enumerate() {
            if !task.is_pending() || !self.dependencies_completed(task) {
                continue;
            }
            match best {
                Some((_, best_priority)) if task.priority <= best_priority => {}
                _ => best = Some((index, task.priority)),
            }
        }
        best.map(|(index, _)| index)
    }

    fn dependencies_completed(&self, task: &TaskRecord) -> bool {
        task.dependencies.iter().all(|dep| {
            self.find_by_id(dep)
                .is_some_and(|d| d.status == TaskStatus::Completed)
        })
    }

    pub fn has_pending(&self) -> bool {
        self.records.iter().any(TaskRecord::is_pending)
    }

    /// Number of tasks that have reached a terminal state
    pub fn settled_count(&self) -> usize {
        self.records.iter().filter(|t| t.is_terminal()).count()
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.records.iter().filter(|t| t.status == status).count()
    }

    /// Mark every remaining `pending` task as blocked. Called when no
    /// pending task can ever become eligible (its dependency chain contains
    /// a blocked task), so the loop terminates with the stuck tasks
    /// accounted for.
    pub fn block_unreachable(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<String> {
        let mut blocked = Vec::new();
        for task in &mut self.records {
            if task.is_pending() {
                task.mark_blocked(now, "dependency_blocked");
                blocked.push(task.id.clone());
            }
        }
        blocked
    }

    /// Load the authoritative task list from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::State(format!("cannot read task list {}: {e}", path.display()))
        })?;
        let records: Vec<TaskRecord> = serde_json::from_str(&content).map_err(|e| {
            EngineError::State(format!("malformed task list {}: {e}", path.display()))
        })?;
        Ok(Self::new(records))
    }

    /// Write the task list atomically (temp file + rename), so a crash
    /// mid-write never leaves a truncated `tasks.json` behind.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Take the on-disk list as authoritative, warning when the in-memory
    /// copy has drifted (ids added or removed outside the engine).
    pub fn reconcile(disk: TaskList, memory: &[TaskRecord]) -> TaskList {
        let disk_ids: HashSet<&str> = disk.records.iter().map(|t| t.id.as_str()).collect();
        let memory_ids: HashSet<&str> = memory.iter().map(|t| t.id.as_str()).collect();
        if disk_ids != memory_ids {
            warn!(
                disk = disk_ids.len(),
                memory = memory_ids.len(),
                "task list on disk diverged from session state; taking disk as authoritative"
            );
        }
        disk
    }
}
