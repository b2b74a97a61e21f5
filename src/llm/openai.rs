//! OpenAI-compatible LLM provider implementation.
//!
//! Works with OpenAI, Ollama's `/v1` endpoint, vLLM, and any other service
//! implementing the chat completions API with `json_schema` response format.

use super::provider::{
    CompletionOptions, LlmError, LlmProvider, Message, MessageRole, ResponseSchema,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible structured-output provider.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g. "https://api.openai.com/v1"
    ///   or "http://localhost:11434/v1" for Ollama).
    /// * `model` - Model to use.
    /// * `api_key` - Optional static API key.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    fn build_request(
        &self,
        schema: &ResponseSchema,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(|m| m.into()).collect(),
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema.name.to_string(),
                    schema: schema.schema.clone(),
                    strict: true,
                },
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_structured(
        &self,
        schema: &ResponseSchema,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<serde_json::Value, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(schema, messages, options);

        debug!(
            model = %self.model,
            schema = %schema.name,
            message_count = messages.len(),
            "Sending structured completion request"
        );

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to parse response: {}", e)))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::SchemaValidation("No choices in response".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::SchemaValidation(
                "Empty completion content".to_string(),
            ));
        }

        serde_json::from_str(&content).map_err(|e| {
            LlmError::SchemaValidation(format!("Reply is not valid JSON: {}", e))
        })
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        ApiMessage {
            role: role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
