use pdfqa_core::{EmbeddingConfig, PdfQaError, Result};
use std::sync::Arc;
use tracing::info;

use crate::hash_provider::HashEmbeddingProvider;
use crate::providers::EmbeddingProvider;

/// Builds the configured embedding provider. `auto` picks OpenAI when an
/// API key is present and the offline hash provider otherwise.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let has_key = config
        .openai_api_key
        .as_deref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);

    let provider = match config.provider.to_ascii_lowercase().as_str() {
        "hash" => "hash",
        "openai" => "openai",
        "auto" if has_key => "openai",
        "auto" => "hash",
        other => {
            return Err(PdfQaError::config(format!(
                "Unknown embedding provider: {}",
                other
            )))
        }
    };

    match provider {
        "openai" => openai(config),
        _ => {
            info!(
                "Using offline hash embeddings ({} dimensions)",
                config.dimension
            );
            Ok(Arc::new(HashEmbeddingProvider::new(config.dimension)))
        }
    }
}

#[cfg(feature = "openai")]
fn openai(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    use crate::openai_provider::{OpenAiConfig, OpenAiEmbeddingProvider};

    info!("Using OpenAI embeddings with model {}", config.model);
    let provider = OpenAiEmbeddingProvider::new(OpenAiConfig::from_embedding_config(config))?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn openai(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(PdfQaError::config(
        "OpenAI embeddings require the `openai` feature",
    ))
}
