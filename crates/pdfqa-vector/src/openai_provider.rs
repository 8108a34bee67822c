use crate::providers::EmbeddingProvider;
use async_trait::async_trait;
use pdfqa_core::{EmbeddingConfig, PdfQaError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Configuration for OpenAI embedding provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub max_retries: usize,
    pub timeout: Duration,
    /// Inputs longer than this many characters are truncated
    pub max_chars_per_text: usize,
    /// Requested vector length; the model's native length when `None`
    pub dimension: Option<usize>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: "text-embedding-3-small".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_retries: 2,
            timeout: Duration::from_secs(30),
            max_chars_per_text: 32_000,
            dimension: None,
        }
    }
}

impl OpenAiConfig {
    pub fn from_embedding_config(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            dimension: Some(config.dimension),
            ..Self::default()
        }
    }
}

/// OpenAI API request structure for embeddings
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// OpenAI API response structure for embeddings
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: usize,
}

/// Error response from OpenAI API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// OpenAI embedding provider implementation
pub struct OpenAiEmbeddingProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(PdfQaError::config(
                "OpenAI API key is required. Set OPENAI_API_KEY environment variable.",
            ));
        }

        if let Some(dimension) = config.dimension {
            let native = native_dimension(&config.model);
            if dimension == 0 || dimension > native {
                return Err(PdfQaError::config(format!(
                    "{} produces at most {} dimensions, {} configured",
                    config.model, native, dimension
                )));
            }
            if dimension != native && !supports_dimensions(&config.model) {
                return Err(PdfQaError::config(format!(
                    "{} only produces {}-dimensional embeddings, {} configured",
                    config.model, native, dimension
                )));
            }
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("PdfQA/1.0")
            .build()
            .map_err(|e| PdfQaError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn prepare_text(&self, text: &str) -> String {
        let text = text.replace('\n', " ");
        match text.char_indices().nth(self.config.max_chars_per_text) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        }
    }

    /// `dimensions` is only sent when it differs from the model's native length.
    fn build_request<'a>(&'a self, texts: &'a [String]) -> EmbeddingRequest<'a> {
        let native = native_dimension(&self.config.model);
        EmbeddingRequest {
            input: texts,
            model: &self.config.model,
            encoding_format: "float",
            dimensions: self.config.dimension.filter(|d| *d != native),
        }
    }

    /// Call OpenAI embeddings API with retry logic
    async fn call_api(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = self.build_request(texts);

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt as u32));
                tokio::time::sleep(delay).await;
            }

            let request_result = timeout(
                self.config.timeout,
                self.client
                    .post(format!("{}/embeddings", self.config.api_base))
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
                    .send(),
            )
            .await;

            match request_result {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<EmbeddingResponse>().await {
                            Ok(body) => return Self::into_vectors(body, texts.len()),
                            Err(e) => {
                                last_error = Some(PdfQaError::External(format!(
                                    "Failed to parse response: {}",
                                    e
                                )));
                            }
                        }
                    } else if let Ok(api_error) = response.json::<ApiError>().await {
                        last_error = Some(PdfQaError::External(format!(
                            "OpenAI API error: {} ({})",
                            api_error.error.message,
                            api_error.error.error_type.unwrap_or_else(|| status.to_string())
                        )));
                    } else {
                        last_error = Some(PdfQaError::External(format!(
                            "OpenAI API error: HTTP {}",
                            status
                        )));
                    }
                }
                Ok(Err(e)) => {
                    last_error = Some(PdfQaError::Network(format!("Request failed: {}", e)));
                }
                Err(_) => {
                    last_error = Some(PdfQaError::Timeout(
                        "OpenAI embeddings request timed out".to_string(),
                    ));
                }
            }

            if attempt < self.config.max_retries {
                warn!(
                    "OpenAI embeddings call failed (attempt {}/{}), retrying...",
                    attempt + 1,
                    self.config.max_retries + 1
                );
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PdfQaError::External("All OpenAI API retry attempts failed".to_string())
        }))
    }

    fn into_vectors(body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
        if let Some(usage) = &body.usage {
            debug!(
                "OpenAI embeddings: {} vectors, {} tokens",
                body.data.len(),
                usage.total_tokens
            );
        }
        if body.data.len() != expected {
            return Err(crate::VectorError::BatchSizeMismatch(expected, body.data.len()).into());
        }
        // Sort embeddings by index to maintain order
        let mut data = body.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let input = [self.prepare_text(text)];
        self.call_api(&input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PdfQaError::External("No embedding returned from OpenAI API".into()))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs: Vec<String> = texts.iter().map(|t| self.prepare_text(t)).collect();
        self.call_api(&inputs).await
    }

    fn embedding_dimension(&self) -> usize {
        self.config
            .dimension
            .unwrap_or_else(|| native_dimension(&self.config.model))
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    async fn is_available(&self) -> bool {
        let health_check = timeout(
            Duration::from_secs(5),
            self.client
                .get(format!("{}/models", self.config.api_base))
                .bearer_auth(&self.config.api_key)
                .send(),
        )
        .await;

        matches!(health_check, Ok(Ok(response)) if response.status().is_success())
    }
}

fn native_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Only the text-embedding-3 family can shorten its vectors.
fn supports_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = OpenAiConfig {
            api_key: String::new(),
            ..OpenAiConfig::default()
        };
        assert!(matches!(
            OpenAiEmbeddingProvider::new(config),
            Err(PdfQaError::Configuration(_))
        ));
    }

    fn keyed(model: &str, dimension: Option<usize>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".into(),
            model: model.into(),
            dimension,
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn test_configured_dimension_is_requested() {
        let provider = OpenAiEmbeddingProvider::new(keyed("text-embedding-3-small", Some(256))).unwrap();
        assert_eq!(provider.embedding_dimension(), 256);

        let texts = vec!["revenue".to_string()];
        let json = serde_json::to_value(provider.build_request(&texts)).unwrap();
        assert_eq!(json["dimensions"], 256);
    }

    #[test]
    fn test_native_dimension_not_sent() {
        let provider = OpenAiEmbeddingProvider::new(keyed("text-embedding-3-large", None)).unwrap();
        assert_eq!(provider.embedding_dimension(), 3072);

        let provider = OpenAiEmbeddingProvider::new(keyed("text-embedding-3-small", Some(1536))).unwrap();
        let texts = vec!["revenue".to_string()];
        let json = serde_json::to_value(provider.build_request(&texts)).unwrap();
        assert!(json.get("dimensions").is_none());
    }

    #[test]
    fn test_unsupported_dimension_rejected() {
        for config in [
            keyed("text-embedding-ada-002", Some(256)),
            keyed("text-embedding-3-small", Some(4096)),
            keyed("text-embedding-3-small", Some(0)),
        ] {
            assert!(matches!(
                OpenAiEmbeddingProvider::new(config),
                Err(PdfQaError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_response_sorted_by_index() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0],"index":0}],
                "model":"text-embedding-3-small","usage":{"prompt_tokens":2,"total_tokens":2}}"#,
        )
        .unwrap();
        let vectors = OpenAiEmbeddingProvider::into_vectors(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_short_response_rejected() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[1.0],"index":0}]}"#).unwrap();
        assert!(OpenAiEmbeddingProvider::into_vectors(body, 3).is_err());
    }

    #[test]
    fn test_config_from_embedding_config() {
        let mut embedding = EmbeddingConfig::default();
        embedding.openai_api_key = Some("sk-test".into());
        embedding.api_base = "http://localhost:8080/v1/".into();
        let config = OpenAiConfig::from_embedding_config(&embedding);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimension, Some(1536));
    }
}
