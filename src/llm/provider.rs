//! LLM provider trait and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A named JSON schema constraining a structured completion.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// Options for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Errors from LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model output does not match the requested schema: {0}")]
    SchemaValidation(String),
}

/// Trait for chat-completion backends that honor a JSON schema.
///
/// `complete_structured` returns the raw JSON value of the reply; callers
/// deserialize it into their target type immediately at this boundary and map
/// decode failures to [`LlmError::SchemaValidation`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name of the provider (for logs).
    fn name(&self) -> &str;

    /// Model identifier this provider talks to.
    fn model(&self) -> &str;

    /// Request a completion constrained to `schema` and parse the reply as a
    /// single JSON value.
    async fn complete_structured(
        &self,
        schema: &ResponseSchema,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<serde_json::Value, LlmError>;
}
