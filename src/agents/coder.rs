//! Coder agent: advances the coding loop by exactly one task per
//! invocation.
//!
//! The on-disk `tasks.json` is authoritative. The terminal status write is
//! the commit point: a crash between `started_at` and completion leaves
//! the task `pending` on disk, so a resumed session retries it. Completed
//! and blocked tasks are never re-run.

use crate::agents::prompts;
use crate::artifacts::ArtifactStore;
use crate::env::artifacts;
use crate::error::Result;
use crate::state::{SessionState, StatePatch};
use crate::task::TaskList;
use crate::workflow::WorkflowNode;
use crate::worker::{TaskWorker, WorkerInvocation};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct CoderNode {
    worker: Arc<dyn TaskWorker>,
    store: ArtifactStore,
}

impl CoderNode {
    pub fn new(worker: Arc<dyn TaskWorker>, store: ArtifactStore) -> Self {
        Self { worker, store }
    }
}

#[async_trait::async_trait]
impl WorkflowNode for CoderNode {
    fn name(&self) -> &'static str {
        "coder"
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let tasks_path = self.store.resolve(artifacts::TASKS_FILE_NAME)?;
        let disk = TaskList::load(&tasks_path).await?;
        let mut list = TaskList::reconcile(disk, &state.tasks);

        // nothing left to attempt
        if !list.has_pending() {
            let settled = list.settled_count();
            return Ok(StatePatch {
                tasks: Some(list.into_records()),
                current_task_index: Some(settled),
                ..StatePatch::default()
            });
        }

        let Some(index) = list.select_next() else {
            // pending work remains but every pending task sits behind a
            // blocked dependency; settle them so the run can terminate
            let stuck = list.block_unreachable(Utc::now());
            warn!(
                tasks = ?stuck,
                "remaining tasks are unreachable behind blocked dependencies"
            );
            list.save(&tasks_path).await?;
            let settled = list.settled_count();
            return Ok(StatePatch {
                tasks: Some(list.into_records()),
                current_task_index: Some(settled),
                ..StatePatch::default()
            });
        };

        let prd = self.store.read_text(artifacts::PRD_FILE_NAME).await?;
        let design = self.store.read_text(artifacts::DESIGN_FILE_NAME).await?;

        let task = list.get_mut(index).expect("selected index is valid");
        task.mark_started(Utc::now());
        let task_id = task.id.clone();
        let prompt = prompts::coder(&prd, &design, task);
        info!(task_id = %task_id, title = %task.title, "starting task");
        list.save(&tasks_path).await?;

        let code_dir = state.code_dir();
        tokio::fs::create_dir_all(&code_dir).await?;

        let outcome = self
            .worker
            .execute(WorkerInvocation {
                task_id: task_id.clone(),
                prompt,
                work_dir: code_dir.clone(),
                add_dir: code_dir,
                log_dir: Some(crate::env::worker_logs_dir_path(self.store.root())),
            })
            .await;

        let now = Utc::now();
        let task = list.get_mut(index).expect("selected index is valid");
        if outcome.success {
            task.mark_completed(now);
            info!(task_id = %task_id, elapsed = outcome.elapsed, "task completed");
        } else {
            let reason = outcome.reason_label();
            task.mark_blocked(now, reason.clone());
            warn!(task_id = %task_id, reason = %reason, "task blocked");
        }
        list.save(&tasks_path).await?;

        let settled = list.settled_count();
        Ok(StatePatch {
            tasks: Some(list.into_records()),
            current_task_index: Some(settled),
            iterations: Some(state.iterations + 1),
            ..StatePatch::default()
        })
    }
}
