use crate::llm::types::{CompletionRequest, CompletionResponse, LlmError};
use futures::future::BoxFuture;

/// Text-completion seam used by every planner agent.
///
/// Implementations must be stateless with respect to the workflow: each call
/// carries its full prompt, and retries are the implementation's concern.
pub trait PlannerModel: Send + Sync {
    /// Execute a single completion request
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<CompletionResponse, LlmError>>;
}
