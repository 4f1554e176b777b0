//! LLM Client implementation
//!
//! Supports two OpenAI-style wire formats:
//! - Responses API (`/responses`, instructions + input list)
//! - Chat completions (`/chat/completions`, OpenAI-compatible servers)
//!
//! No retries: a failed call surfaces to the session as a turn failure.

use super::{ChatMessage, LanguageModel, LlmConfig};
use crate::error::{Result, SheetAiError};
use crate::util::{sanitize_base_url, validate_bearer};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Client as HttpClient, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// LLM Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI Responses API
    OpenAiResponses,
    /// OpenAI-compatible chat completions (Ollama, LM Studio, OpenRouter, ...)
    OpenAiCompatible,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "responses" => Ok(LlmProvider::OpenAiResponses),
            "compatible" | "chat" | "ollama" | "lmstudio" | "openrouter" | "local" => {
                Ok(LlmProvider::OpenAiCompatible)
            }
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAiResponses => write!(f, "OpenAI Responses"),
            LlmProvider::OpenAiCompatible => write!(f, "OpenAI Compatible"),
        }
    }
}

/// HTTP client for the language model
pub struct LlmClient {
    config: LlmConfig,
    http_client: HttpClient,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: LlmConfig) -> Result<Self> {
        sanitize_base_url(&config.base_url, "llm.base_url")?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sheetai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SheetAiError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(LlmClient {
            config,
            http_client,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let base_url = sanitize_base_url(&self.config.base_url, "llm.base_url")?;
        Ok(format!("{}/{}", base_url, path))
    }

    /// Build headers for API requests
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().map_err(invalid_header)?);

        // Local servers usually run without a key
        if let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let key = validate_bearer(api_key, "llm.api_key")?;
            headers.insert(
                AUTHORIZATION,
                format!("Bearer {}", key).parse().map_err(invalid_header)?,
            );
        } else if self.config.provider == LlmProvider::OpenAiResponses {
            return Err(SheetAiError::MissingConfig {
                key: "llm.api_key".to_string(),
            });
        }

        Ok(headers)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let url = self.endpoint(path)?;
        let headers = self.build_headers()?;

        let started = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Model request to {} failed after {:?}: {}", url, started.elapsed(), e);
                SheetAiError::from(e)
            })?;

        let status = response.status();
        let text = response.text().await?;
        info!(
            "Model {} answered {} in {:?}",
            self.config.model,
            status.as_u16(),
            started.elapsed()
        );

        if !status.is_success() {
            return Err(error_for_status(status, &text));
        }
        Ok(text)
    }

    async fn respond_responses(&self, instructions: &str, input: &[ChatMessage]) -> Result<String> {
        let body = ResponsesRequest {
            model: &self.config.model,
            instructions,
            input,
        };
        let text = self.post("responses", &body).await?;
        let parsed: ResponsesResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse Responses payload: {}. Raw body: {}", e, text);
            SheetAiError::from(e)
        })?;
        Ok(parsed.output_text())
    }

    async fn respond_chat(&self, instructions: &str, input: &[ChatMessage]) -> Result<String> {
        let mut messages = Vec::with_capacity(input.len() + 1);
        if !instructions.is_empty() {
            messages.push(ChatMessage::system(instructions));
        }
        messages.extend_from_slice(input);

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: &messages,
            stream: false,
        };
        let text = self.post("chat/completions", &body).await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse chat completion: {}. Raw body: {}", e, text);
            SheetAiError::from(e)
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| SheetAiError::EmptyResponse {
                model: self.config.model.clone(),
            })
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn respond(&self, instructions: &str, input: &[ChatMessage]) -> Result<String> {
        debug!(
            "Model request: provider={}, model={}, turns={}",
            self.config.provider,
            self.config.model,
            input.len()
        );
        match self.config.provider {
            LlmProvider::OpenAiResponses => self.respond_responses(instructions, input).await,
            LlmProvider::OpenAiCompatible => self.respond_chat(instructions, input).await,
        }
    }
}

fn invalid_header<E: std::fmt::Display>(e: E) -> SheetAiError {
    SheetAiError::InvalidConfig {
        message: format!("invalid header value: {}", e),
    }
}

/// Map a non-2xx provider answer onto the error taxonomy
fn error_for_status(status: StatusCode, body: &str) -> SheetAiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown error".to_string());

    match status {
        StatusCode::UNAUTHORIZED => SheetAiError::Unauthorized { message },
        StatusCode::TOO_MANY_REQUESTS => SheetAiError::RateLimitExceeded { message },
        status => SheetAiError::ProviderError {
            status: status.as_u16(),
            message,
        },
    }
}

// Responses API types
#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    instructions: &'a str,
    input: &'a [ChatMessage],
}

#[derive(Deserialize, Default)]
struct ResponsesResponse {
    /// Some proxies flatten the text for us
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
}

#[derive(Deserialize)]
struct ResponsesOutputItem {
    #[serde(default)]
    content: Vec<ResponsesContent>,
}

#[derive(Deserialize)]
struct ResponsesContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    /// Concatenate every `output_text` part, in order
    fn output_text(self) -> String {
        if let Some(text) = self.output_text {
            return text;
        }
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect()
    }
}

// OpenAI-compatible chat completion types
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        LlmConfig::new(
            provider,
            "https://api.example.com/v1/".into(),
            "gpt-5-mini".into(),
            api_key.map(str::to_string),
        )
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAiResponses);
        assert_eq!("Ollama".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAiCompatible);
        assert!("gemini".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_client_creation_rejects_bad_url() {
        let mut cfg = config(LlmProvider::OpenAiResponses, Some("sk-test"));
        cfg.base_url = "api.example.com".into();
        assert!(LlmClient::new(cfg).is_err());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = LlmClient::new(config(LlmProvider::OpenAiResponses, Some("sk-test"))).unwrap();
        assert_eq!(client.endpoint("responses").unwrap(), "https://api.example.com/v1/responses");
        assert_eq!(client.model(), "gpt-5-mini");
    }

    #[test]
    fn test_headers_require_key_for_responses_api() {
        let client = LlmClient::new(config(LlmProvider::OpenAiResponses, None)).unwrap();
        assert!(matches!(
            client.build_headers(),
            Err(SheetAiError::MissingConfig { .. })
        ));

        let local = LlmClient::new(config(LlmProvider::OpenAiCompatible, None)).unwrap();
        let headers = local.build_headers().unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_headers_carry_bearer() {
        let client = LlmClient::new(config(LlmProvider::OpenAiResponses, Some("sk-test"))).unwrap();
        let headers = client.build_headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
    }

    #[test]
    fn test_responses_request_shape() {
        let input = vec![ChatMessage::user("list my sheets")];
        let body = ResponsesRequest {
            model: "gpt-5-mini",
            instructions: "emit json",
            input: &input,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-5-mini");
        assert_eq!(json["instructions"], "emit json");
        assert_eq!(json["input"][0]["role"], "user");
        assert_eq!(json["input"][0]["content"], "list my sheets");
    }

    #[test]
    fn test_responses_output_text_concatenates_parts() {
        let raw = r#"{
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "{\"action\":", "annotations": []},
                    {"type": "output_text", "text": "\"LIST\"}", "annotations": []}
                ]}
            ]
        }"#;
        let parsed: ResponsesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.output_text(), r#"{"action":"LIST"}"#);
    }

    #[test]
    fn test_responses_without_text_is_empty() {
        let parsed: ResponsesResponse = serde_json::from_str(r#"{"output": []}"#).unwrap();
        assert_eq!(parsed.output_text(), "");
    }

    #[test]
    fn test_error_for_status() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#;
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, body),
            SheetAiError::Unauthorized { message } if message == "Incorrect API key provided"
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, "{}"),
            SheetAiError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, "<html>"),
            SheetAiError::ProviderError { status: 502, message } if message == "Unknown error"
        ));
    }
}
