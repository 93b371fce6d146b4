use async_trait::async_trait;
use thiserror::Error;

use gloss_core::Turn;

/// One atomic completion call: the task's system prompt, the prior
/// conversation, and the new user message. No streaming, no retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub turns: Vec<Turn>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid completion response: {0}")]
    MalformedResponse(String),
}

/// Wraps a single call to a hosted text-completion endpoint. Implementations
/// hold no mutable state; the call is idempotent in effect.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
