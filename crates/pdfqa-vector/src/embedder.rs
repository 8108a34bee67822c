use pdfqa_core::{zero_vector, Chunk, ChunkId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::VectorError;
use crate::providers::{BatchConfig, EmbeddingMetrics, EmbeddingProvider};

/// Wraps an [`EmbeddingProvider`] with the failure policy the pipeline
/// relies on: embedding never fails, a text the provider cannot handle
/// gets the zero vector instead.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    config: BatchConfig,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(provider, BatchConfig::default())
    }

    pub fn with_config(provider: Arc<dyn EmbeddingProvider>, config: BatchConfig) -> Self {
        Self { provider, config }
    }

    pub fn dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Embeds one text; on failure logs and returns the zero vector.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let dimension = self.dimension();
        match self.provider.embed_text(text).await {
            Ok(vector) => checked(vector, dimension).unwrap_or_else(|e| {
                warn!("Discarding embedding: {}", e);
                zero_vector(dimension)
            }),
            Err(e) => {
                warn!("Embedding failed, using zero vector: {}", e);
                zero_vector(dimension)
            }
        }
    }

    /// One vector per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.embed_batch_with_metrics(texts).await.0
    }

    pub async fn embed_batch_with_metrics(
        &self,
        texts: &[String],
    ) -> (Vec<Vec<f32>>, EmbeddingMetrics) {
        let items: Vec<(usize, String)> = texts.iter().cloned().enumerate().collect();
        let (mut vectors, metrics) = self.embed_keyed(items).await;
        let dimension = self.dimension();
        let ordered = (0..texts.len())
            .map(|idx| vectors.remove(&idx).unwrap_or_else(|| zero_vector(dimension)))
            .collect();
        (ordered, metrics)
    }

    /// Embeds every chunk in place. Returns after all tasks resolved;
    /// results are matched back by chunk id, not completion order.
    pub async fn embed_chunks(&self, chunks: &mut [Chunk]) -> EmbeddingMetrics {
        let items: Vec<(ChunkId, String)> =
            chunks.iter().map(|c| (c.id, c.text.clone())).collect();
        let (mut vectors, metrics) = self.embed_keyed(items).await;
        let dimension = self.dimension();
        for chunk in chunks.iter_mut() {
            let vector = vectors
                .remove(&chunk.id)
                .unwrap_or_else(|| zero_vector(dimension));
            chunk.embedding = Some(vector);
        }
        metrics
    }

    /// Fans `items` out in groups of `batch_size`, at most `max_concurrent`
    /// groups in flight, and collects every key into the result map.
    async fn embed_keyed<K>(&self, items: Vec<(K, String)>) -> (HashMap<K, Vec<f32>>, EmbeddingMetrics)
    where
        K: Eq + Hash + Copy + Send + 'static,
    {
        let start = Instant::now();
        let total = items.len();
        let dimension = self.dimension();
        let keys: Vec<K> = items.iter().map(|(key, _)| *key).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let batch_size = self.config.batch_size.max(1);

        let mut handles = Vec::with_capacity(total / batch_size + 1);
        let mut remaining = items.into_iter().peekable();
        while remaining.peek().is_some() {
            let group: Vec<(K, String)> = remaining.by_ref().take(batch_size).collect();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                embed_group(provider.as_ref(), group, dimension).await
            }));
        }

        let mut results: HashMap<K, Vec<f32>> = HashMap::with_capacity(total);
        let mut failures = 0usize;
        for handle in handles {
            match handle.await {
                Ok(group) => {
                    for (key, vector) in group {
                        let vector = vector.unwrap_or_else(|| {
                            failures += 1;
                            zero_vector(dimension)
                        });
                        results.insert(key, vector);
                    }
                }
                Err(e) => warn!("Embedding task did not complete: {}", e),
            }
        }
        for key in keys {
            results.entry(key).or_insert_with(|| {
                failures += 1;
                zero_vector(dimension)
            });
        }

        let metrics = EmbeddingMetrics::new(
            self.provider.provider_name().to_string(),
            total,
            failures,
            start.elapsed(),
        );
        if failures > 0 {
            warn!(
                "{} of {} texts could not be embedded and score as zero vectors",
                failures, total
            );
        }
        info!(
            "Embedded {} texts via {} in {:?} ({:.2} texts/s)",
            metrics.texts_processed, metrics.provider_name, metrics.duration, metrics.throughput
        );

        (results, metrics)
    }
}

/// Tries the whole group in one call; when that fails each text is retried
/// on its own so one bad input only costs itself. `None` marks a failure.
async fn embed_group<K>(
    provider: &dyn EmbeddingProvider,
    group: Vec<(K, String)>,
    dimension: usize,
) -> Vec<(K, Option<Vec<f32>>)> {
    let texts: Vec<String> = group.iter().map(|(_, text)| text.clone()).collect();
    let batch = match provider.embed_texts(&texts).await {
        Ok(vectors) if vectors.len() == texts.len() => Some(vectors),
        Ok(vectors) => {
            debug!("{}", VectorError::BatchSizeMismatch(texts.len(), vectors.len()));
            None
        }
        Err(e) => {
            debug!("Batch of {} failed, embedding individually: {}", texts.len(), e);
            None
        }
    };

    match batch {
        Some(vectors) => group
            .into_iter()
            .zip(vectors)
            .map(|((key, _), vector)| (key, checked(vector, dimension).ok()))
            .collect(),
        None => {
            let mut out = Vec::with_capacity(group.len());
            for (key, text) in group {
                let vector = match provider.embed_text(&text).await {
                    Ok(vector) => checked(vector, dimension).ok(),
                    Err(e) => {
                        warn!("Embedding failed, using zero vector: {}", e);
                        None
                    }
                };
                out.push((key, vector));
            }
            out
        }
    }
}

fn checked(vector: Vec<f32>, dimension: usize) -> Result<Vec<f32>, VectorError> {
    if vector.len() == dimension {
        Ok(vector)
    } else {
        Err(VectorError::DimensionMismatch(dimension, vector.len()))
    }
}
