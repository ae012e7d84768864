use serde::{Deserialize, Serialize};

/// One planner completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt framing the agent role
    pub system: Option<String>,
    /// User-turn prompt rendered from the agent template
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: 8192,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Completion result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Planner model errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned empty output")]
    EmptyResponse,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
