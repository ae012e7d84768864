//! Product-manager agent: PRD draft and post-review revision.

use crate::artifacts::ArtifactStore;
use crate::env::artifacts;
use crate::error::{EngineError, Result};
use crate::llm::{CompletionRequest, PlannerModel};
use crate::state::{SessionState, StatePatch};
use crate::workflow::WorkflowNode;
use crate::agents::prompts;
use std::sync::Arc;
use tracing::info;

/// `pm_draft`: turns the raw requirement into `PRD.md`.
pub struct PmDraftNode {
    model: Arc<dyn PlannerModel>,
    store: ArtifactStore,
    model_name: String,
}

impl PmDraftNode {
    pub fn new(model: Arc<dyn PlannerModel>, store: ArtifactStore, model_name: String) -> Self {
        Self {
            model,
            store,
            model_name,
        }
    }
}

#[async_trait::async_trait]
impl WorkflowNode for PmDraftNode {
    fn name(&self) -> &'static str {
        "pm_draft"
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let request = CompletionRequest::new(&self.model_name, prompts::pm_draft(&state.requirement))
            .with_system(prompts::PM_SYSTEM);
        let response = self
            .model
            .complete(request)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        let prd = non_empty(response.content, "PRD draft")?;
        let path = self.store.write_text(artifacts::PRD_FILE_NAME, &prd).await?;
        info!(path = %path.display(), "PRD drafted");

        Ok(StatePatch {
            prd_path: Some(path),
            ..StatePatch::default()
        })
    }
}

/// `pm_revise`: folds the three reviews (and optional human feedback) back
/// into `PRD.md` and records the reviews as `PRD_Reviews.md`.
pub struct PmReviseNode {
    model: Arc<dyn PlannerModel>,
    store: ArtifactStore,
    model_name: String,
}

impl PmReviseNode {
    pub fn new(model: Arc<dyn PlannerModel>, store: ArtifactStore, model_name: String) -> Self {
        Self {
            model,
            store,
            model_name,
        }
    }
}

#[async_trait::async_trait]
impl WorkflowNode for PmReviseNode {
    fn name(&self) -> &'static str {
        "pm_revise"
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        // fan-in guard: every reviewer patch must have landed
        if state.reviews.len() < crate::state::ReviewRole::ALL.len() {
            return Err(EngineError::State(format!(
                "pm_revise entered with {} of {} reviews present",
                state.reviews.len(),
                crate::state::ReviewRole::ALL.len()
            )));
        }

        let prd = self.store.read_text(artifacts::PRD_FILE_NAME).await?;
        let request = CompletionRequest::new(
            &self.model_name,
            prompts::pm_revise(
                &state.requirement,
                &prd,
                &state.reviews,
                state.feedback.as_deref(),
            ),
        )
        .with_system(prompts::PM_SYSTEM);
        let response = self
            .model
            .complete(request)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        let revised = non_empty(response.content, "PRD revision")?;
        let prd_path = self
            .store
            .write_text(artifacts::PRD_FILE_NAME, &revised)
            .await?;

        // audit record of what the revision was based on
        let mut audit = String::from("# PRD Reviews\n");
        for (role, review) in &state.reviews {
            audit.push_str(&format!("\n## {}\n\n{review}\n", role.heading()));
        }
        if let Some(feedback) = &state.feedback {
            audit.push_str(&format!("\n## Human Feedback\n\n{feedback}\n"));
        }
        let reviews_path = self
            .store
            .write_text(artifacts::REVIEWS_FILE_NAME, &audit)
            .await?;
        info!(path = %prd_path.display(), "PRD revised from reviews");

        Ok(StatePatch {
            prd_path: Some(prd_path),
            reviews_path: Some(reviews_path),
            clear_feedback: true,
            ..StatePatch::default()
        })
    }
}

pub(crate) fn non_empty(content: String, what: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(EngineError::Llm(format!("{what} came back empty")));
    }
    Ok(content)
}
