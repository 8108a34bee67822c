use async_trait::async_trait;
use pdfqa_core::{EmbeddingConfig, PerformanceConfig, Result};
use std::time::Duration;

/// Performance metrics for embedding operations
#[derive(Debug, Clone)]
pub struct EmbeddingMetrics {
    pub texts_processed: usize,
    /// Texts that fell back to the zero vector
    pub failures: usize,
    pub duration: Duration,
    pub throughput: f64, // texts per second
    pub average_latency: Duration,
    pub provider_name: String,
}

impl EmbeddingMetrics {
    pub fn new(
        provider_name: String,
        texts_processed: usize,
        failures: usize,
        duration: Duration,
    ) -> Self {
        let throughput = if duration.is_zero() {
            0.0
        } else {
            texts_processed as f64 / duration.as_secs_f64()
        };

        let average_latency = if texts_processed == 0 {
            Duration::ZERO
        } else {
            duration / texts_processed as u32
        };

        Self {
            texts_processed,
            failures,
            duration,
            throughput,
            average_latency,
            provider_name,
        }
    }
}

/// Configuration for embedding batch operations
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Texts handed to the provider per task
    pub batch_size: usize,
    /// Tasks allowed to call the provider at the same time
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            max_concurrent: 4,
        }
    }
}

impl BatchConfig {
    pub fn from_config(embedding: &EmbeddingConfig, performance: &PerformanceConfig) -> Self {
        Self {
            batch_size: embedding.batch_size.max(1),
            max_concurrent: performance.max_concurrent_embeddings.max(1),
        }
    }
}

/// Unified trait for all embedding providers (local and remote)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for several texts, one vector per input in
    /// input order. A provider may fail the whole call.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text).await?);
        }
        Ok(out)
    }

    /// Get the embedding dimension for this provider
    fn embedding_dimension(&self) -> usize;

    /// Get provider name for identification
    fn provider_name(&self) -> &str;

    /// Check if provider is available (e.g., API accessible)
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_throughput() {
        let metrics = EmbeddingMetrics::new("test".into(), 10, 1, Duration::from_secs(2));
        assert_eq!(metrics.throughput, 5.0);
        assert_eq!(metrics.average_latency, Duration::from_millis(200));

        let empty = EmbeddingMetrics::new("test".into(), 0, 0, Duration::ZERO);
        assert_eq!(empty.throughput, 0.0);
        assert_eq!(empty.average_latency, Duration::ZERO);
    }

    #[test]
    fn test_batch_config_never_zero() {
        let mut embedding = EmbeddingConfig::default();
        embedding.batch_size = 0;
        let mut performance = PerformanceConfig::default();
        performance.max_concurrent_embeddings = 0;
        let config = BatchConfig::from_config(&embedding, &performance);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_concurrent, 1);
    }
}
