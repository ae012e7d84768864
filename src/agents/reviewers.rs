//! Reviewer fan-out: three independent critiques of the PRD.
//!
//! One node type parameterized by role. Each reviewer reads only the PRD
//! and writes only its own `reviews[role]` key, so execution order does
//! not matter.

use crate::agents::prompts;
use crate::artifacts::ArtifactStore;
use crate::env::artifacts;
use crate::error::{EngineError, Result};
use crate::llm::{CompletionRequest, PlannerModel};
use crate::state::{ReviewRole, SessionState, StatePatch};
use crate::workflow::WorkflowNode;
use std::sync::Arc;
use tracing::info;

pub struct ReviewerNode {
    role: ReviewRole,
    model: Arc<dyn PlannerModel>,
    store: ArtifactStore,
    model_name: String,
}

impl ReviewerNode {
    pub fn new(
        role: ReviewRole,
        model: Arc<dyn PlannerModel>,
        store: ArtifactStore,
        model_name: String,
    ) -> Self {
        Self {
            role,
            model,
            store,
            model_name,
        }
    }
}

#[async_trait::async_trait]
impl WorkflowNode for ReviewerNode {
    fn name(&self) -> &'static str {
        match self.role {
            ReviewRole::Pm => "review_pm",
            ReviewRole::Dev => "review_dev",
            ReviewRole::Qa => "review_qa",
        }
    }

    async fn run(&self, _state: &SessionState) -> Result<StatePatch> {
        let prd = self.store.read_text(artifacts::PRD_FILE_NAME).await?;
        let request = CompletionRequest::new(&self.model_name, prompts::reviewer(&prd))
            .with_system(prompts::reviewer_system(self.role));
        let response = self
            .model
            .complete(request)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(EngineError::Llm(format!(
                "{} review came back empty",
                self.role.as_str()
            )));
        }
        info!(role = self.role.as_str(), "PRD review complete");

        Ok(StatePatch::review(self.role, response.content))
    }
}
