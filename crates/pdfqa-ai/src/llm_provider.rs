use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for LLM operations
pub type LLMResult<T> = anyhow::Result<T>;

/// Configuration for generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: Some(250),
            top_p: None,
            stop: None,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    pub total_tokens: Option<usize>,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    /// Finish reason (e.g., "stop", "length")
    pub finish_reason: Option<String>,
    /// Model used for generation
    pub model: String,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            total_tokens: None,
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("stop".to_string()),
            model: model.into(),
        }
    }
}

/// Main trait for LLM providers. The pipeline treats implementations as a
/// black box: one prompt in, one completion out.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        self.generate_with_config(prompt, &GenerationConfig::default())
            .await
    }

    /// Generate a completion with custom configuration
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let messages = vec![Message::user(prompt)];
        self.generate_chat(&messages, config).await
    }

    /// Generate a chat completion with message history
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// Check if the provider is available and ready
    async fn is_available(&self) -> bool;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<(Vec<Message>, GenerationConfig)>>,
    }

    #[async_trait]
    impl LLMProvider for Recorder {
        async fn generate_chat(
            &self,
            messages: &[Message],
            config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), config.clone()));
            Ok(LLMResponse::text("ok", "recorder"))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn provider_name(&self) -> &str {
            "recorder"
        }

        fn model_name(&self) -> &str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_generate_wraps_prompt_as_user_message() {
        let provider = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let response = provider.generate("What changed?").await.unwrap();
        assert_eq!(response.content, "ok");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.len(), 1);
        assert_eq!(seen[0].0[0].role, MessageRole::User);
        assert_eq!(seen[0].0[0].content, "What changed?");
        assert_eq!(seen[0].1.max_tokens, Some(250));
    }

    #[test]
    fn test_generate_with_config_passes_config_through() {
        let provider = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let config = GenerationConfig {
            temperature: 0.0,
            max_tokens: Some(32),
            ..GenerationConfig::default()
        };
        tokio_test::block_on(provider.generate_with_config("Summarise", &config)).unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].1.temperature, 0.0);
        assert_eq!(seen[0].1.max_tokens, Some(32));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }
}
