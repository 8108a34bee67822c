use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pdfqa_core::LLMConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the OpenAI chat provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChatConfig {
    pub api_key: String,
    /// Base URL for API (default: https://api.openai.com/v1)
    pub base_url: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts after a failed request; 0 means a single call
    pub max_retries: u32,
    pub organization: Option<String>,
}

impl Default for OpenAIChatConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_retries: 0,
            organization: std::env::var("OPENAI_ORG_ID").ok(),
        }
    }
}

impl OpenAIChatConfig {
    pub fn from_llm_config(config: &LLMConfig) -> Self {
        let defaults = Self::default();
        Self {
            api_key: config.openai_api_key.clone().unwrap_or(defaults.api_key),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            ..defaults
        }
    }
}

/// OpenAI provider using the Chat Completions API
pub struct OpenAIChatProvider {
    config: OpenAIChatConfig,
    client: Client,
}

impl OpenAIChatProvider {
    pub fn new(config: OpenAIChatConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "OpenAI API key is required. Set OPENAI_API_KEY environment variable."
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIChatConfig::default())
    }

    async fn send_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.try_request(messages, config).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            "OpenAI request failed (attempt {}/{}), retrying...",
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        let request = build_request(&self.config.model, messages, config);

        let mut request_builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request);

        if let Some(org) = &self.config.organization {
            request_builder = request_builder.header("OpenAI-Organization", org);
        }

        let response = request_builder
            .send()
            .await
            .context("Failed to send request to OpenAI Chat Completions API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        response
            .json::<ChatCompletionsResponse>()
            .await
            .context("Failed to parse OpenAI Chat Completions API response")
    }
}

fn build_request(
    model: &str,
    messages: &[Message],
    config: &GenerationConfig,
) -> ChatCompletionsRequest {
    ChatCompletionsRequest {
        model: model.to_string(),
        messages: messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        top_p: config.top_p,
        stop: config.stop.clone(),
    }
}

fn into_llm_response(response: ChatCompletionsResponse) -> Result<LLMResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No choices in response"))?;

    Ok(LLMResponse {
        content: choice.message.content.unwrap_or_default().trim().to_string(),
        total_tokens: response.usage.as_ref().map(|u| u.total_tokens),
        prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        finish_reason: choice.finish_reason,
        model: response.model,
    })
}

#[async_trait]
impl LLMProvider for OpenAIChatProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let start = Instant::now();
        let response = into_llm_response(self.send_request(messages, config).await?)?;

        tracing::debug!(
            "OpenAI completion: {} tokens in {}ms (finish: {:?})",
            response.total_tokens.unwrap_or(0),
            start.elapsed().as_millis(),
            response.finish_reason
        );

        Ok(response)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = build_request(
            "gpt-4o-mini",
            &[Message::user("Question: why?")],
            &GenerationConfig::default(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 250);
        assert!(json.get("stop").is_none());
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "  Revenue grew.  "}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(raw).unwrap();
        let response = into_llm_response(parsed).unwrap();
        assert_eq!(response.content, "Revenue grew.");
        assert_eq!(response.total_tokens, Some(13));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: ChatCompletionsResponse =
            serde_json::from_str(r#"{"model":"m","choices":[]}"#).unwrap();
        assert!(into_llm_response(parsed).is_err());
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = OpenAIChatConfig {
            api_key: String::new(),
            ..OpenAIChatConfig::default()
        };
        assert!(OpenAIChatProvider::new(config).is_err());
    }
}
