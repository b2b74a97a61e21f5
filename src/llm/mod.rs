//! LLM provider abstraction layer.
//!
//! This module provides a trait-based abstraction for chat-completion
//! backends with schema-constrained output, so the augmenter and playlist
//! generator can work against Ollama, OpenAI or any compatible service.

mod openai;
mod provider;

pub use openai::OpenAiProvider;
pub use provider::{
    CompletionOptions, LlmError, LlmProvider, Message, MessageRole, ResponseSchema,
};
