//! Architect agent: technical design plus validated task breakdown.

use crate::agents::prompts;
use crate::agents::pm::non_empty;
use crate::artifacts::ArtifactStore;
use crate::env::artifacts;
use crate::error::{EngineError, Result};
use crate::llm::{CompletionRequest, PlannerModel};
use crate::state::{SessionState, StatePatch};
use crate::task::{TaskList, TaskRecord};
use crate::workflow::WorkflowNode;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

pub struct ArchitectNode {
    model: Arc<dyn PlannerModel>,
    store: ArtifactStore,
    model_name: String,
}

impl ArchitectNode {
    pub fn new(model: Arc<dyn PlannerModel>, store: ArtifactStore, model_name: String) -> Self {
        Self {
            model,
            store,
            model_name,
        }
    }

    /// Split the model output into the design document and the task array.
    ///
    /// The task array is expected in a fenced ```json block; as a fallback
    /// the outermost bracketed span is tried. Model output is never trusted
    /// structurally, so the extracted JSON still goes through full
    /// validation.
    pub(crate) fn split_output(content: &str) -> Result<(String, Vec<TaskRecord>)> {
        let fence = Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```")
            .expect("static regex");

        let (json_span, raw_json) = match fence.captures_iter(content).last() {
            Some(captures) => {
                let whole = captures.get(0).expect("match");
                let inner = captures.get(1).expect("group");
                (Some(whole.range()), inner.as_str().to_string())
            }
            None => {
                let start = content.find('[');
                let end = content.rfind(']');
                match (start, end) {
                    (Some(start), Some(end)) if start < end => {
                        (None, content[start..=end].to_string())
                    }
                    _ => {
                        return Err(EngineError::Validation(
                            "architect output contains no task array".to_string(),
                        ));
                    }
                }
            }
        };

        let tasks: Vec<TaskRecord> = serde_json::from_str(&raw_json)
            .map_err(|e| EngineError::Validation(format!("task array is not valid JSON: {e}")))?;

        let design = match json_span {
            Some(range) => {
                let mut text = String::with_capacity(content.len());
                text.push_str(&content[..range.start]);
                text.push_str(&content[range.end..]);
                text.trim().to_string()
            }
            None => content.trim().to_string(),
        };
        if design.is_empty() {
            return Err(EngineError::Validation(
                "architect output contains no design document".to_string(),
            ));
        }

        Ok((design, tasks))
    }
}

#[async_trait::async_trait]
impl WorkflowNode for ArchitectNode {
    fn name(&self) -> &'static str {
        "architect"
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let prd = self.store.read_text(artifacts::PRD_FILE_NAME).await?;
        let request = CompletionRequest::new(
            &self.model_name,
            prompts::architect(&prd, state.feedback.as_deref()),
        )
        .with_system(prompts::ARCHITECT_SYSTEM);
        let response = self
            .model
            .complete(request)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        let content = non_empty(response.content, "architect output")?;
        let (design, tasks) = Self::split_output(&content)?;
        TaskList::validate_new(&tasks)?;

        let design_path = self
            .store
            .write_text(artifacts::DESIGN_FILE_NAME, &design)
            .await?;
        let tasks_path = self
            .store
            .write_json_atomic(artifacts::TASKS_FILE_NAME, &tasks)
            .await?;
        info!(task_count = tasks.len(), "design and task list produced");

        Ok(StatePatch {
            design_path: Some(design_path),
            tasks_path: Some(tasks_path),
            tasks: Some(tasks),
            current_task_index: Some(0),
            clear_feedback: true,
            ..StatePatch::default()
        })
    }
}
