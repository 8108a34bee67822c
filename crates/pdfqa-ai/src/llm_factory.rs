use crate::llm_provider::*;
use crate::openai_chat_provider::{OpenAIChatConfig, OpenAIChatProvider};
use anyhow::{anyhow, Result};
use pdfqa_core::LLMConfig;
use std::sync::Arc;

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            "openai" => Self::create_openai_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: openai",
                provider_name
            )),
        }
    }

    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider = OpenAIChatProvider::new(OpenAIChatConfig::from_llm_config(config))?;
        tracing::info!("Using OpenAI chat completions with model {}", config.model);
        Ok(Arc::new(provider))
    }

    /// Generation parameters carried by the configuration
    pub fn generation_config(config: &LLMConfig) -> GenerationConfig {
        GenerationConfig {
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            ..GenerationConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let config = LLMConfig {
            provider: "anthropic".into(),
            ..LLMConfig::default()
        };
        let err = LLMProviderFactory::create_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }

    #[test]
    fn test_openai_with_key() {
        let config = LLMConfig {
            openai_api_key: Some("sk-test".into()),
            ..LLMConfig::default()
        };
        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "OpenAI");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_generation_config_from_llm_config() {
        let config = LLMConfig {
            temperature: 0.7,
            max_tokens: 512,
            ..LLMConfig::default()
        };
        let generation = LLMProviderFactory::generation_config(&config);
        assert_eq!(generation.temperature, 0.7);
        assert_eq!(generation.max_tokens, Some(512));
    }
}
