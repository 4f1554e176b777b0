//! Language-model boundary
//!
//! The session only needs "instructions + turns in, free text out"; the
//! [`LanguageModel`] trait is that contract and [`LlmClient`] is the HTTP
//! implementation for OpenAI-style endpoints.

pub mod chat;
pub mod client;

pub use chat::{ChatMessage, MessageRole};
pub use client::{LlmClient, LlmProvider};

use async_trait::async_trait;

use crate::error::Result;

/// Something that turns instructions plus conversation into free text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one request and return the model's text output
    async fn respond(&self, instructions: &str, input: &[ChatMessage]) -> Result<String>;
}

/// LLM Configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider wire format
    pub provider: LlmProvider,
    /// API endpoint base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key (if required)
    pub api_key: Option<String>,
    /// Whole-request timeout
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Create a new LLM config
    pub fn new(
        provider: LlmProvider,
        base_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Self {
        LlmConfig {
            provider,
            base_url,
            model,
            api_key,
            timeout_secs: 120,
        }
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }
}
