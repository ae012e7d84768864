//! Anthropic Messages API planner.
//!
//! Minimal non-streaming client for `POST /v1/messages`. Rate-limit and
//! server errors are retried with exponential backoff and jitter; client
//! errors surface immediately.

use crate::llm::provider::PlannerModel;
use crate::llm::types::{CompletionRequest, CompletionResponse, LlmError};
use futures::future::BoxFuture;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;

/// Planner backed by the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicPlanner {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicPlanner {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(message),
                429 => LlmError::RateLimit(message),
                400 => LlmError::InvalidRequest(message),
                code => LlmError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::UnexpectedResponse(e.to_string()))?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(
            error,
            LlmError::RateLimit(_) | LlmError::Network(_) | LlmError::Api { status: 500..=599, .. }
        )
    }
}

impl PlannerModel for AnthropicPlanner {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<CompletionResponse, LlmError>> {
        Box::pin(async move {
            let mut last_error = LlmError::EmptyResponse;
            for attempt in 0..MAX_ATTEMPTS {
                match self.send_once(&request).await {
                    Ok(response) => {
                        debug!(
                            model = %response.model,
                            input_tokens = response.input_tokens,
                            output_tokens = response.output_tokens,
                            "planner completion finished"
                        );
                        return Ok(response);
                    }
                    Err(error) if Self::is_retryable(&error) && attempt + 1 < MAX_ATTEMPTS => {
                        let jitter = rand::rng().random_range(0..250);
                        let delay =
                            Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt) + jitter);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "planner call failed, retrying: {error}"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = error;
                    }
                    Err(error) => return Err(error),
                }
            }
            Err(last_error)
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
