use async_trait::async_trait;
use fxhash::hash64;
use pdfqa_core::{Result, EMBEDDING_DIMENSION};

use crate::providers::EmbeddingProvider;

/// Offline bag-of-words embedder: every lowercased token is hashed into a
/// bucket and the counts are L2-normalised. Deterministic, so it is what
/// the pipeline falls back to without an API key.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSION)
    }
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let bucket = (hash64(&token) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranker::cosine_similarity;
    use approx::assert_relative_eq;

    #[tokio::test]
    async fn test_deterministic_and_normalised() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed_text("Currency exposure risk").await.unwrap();
        let b = provider.embed_text("currency EXPOSURE, risk!").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_relative_eq!(cosine_similarity(&a, &b), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::default();
        let v = tokio_test::block_on(provider.embed_text("  ...  ")).unwrap();
        assert_eq!(v.len(), EMBEDDING_DIMENSION);
        assert!(pdfqa_core::is_zero_vector(&v));
    }
}
