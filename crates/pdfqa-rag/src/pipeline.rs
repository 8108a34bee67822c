use pdfqa_ai::LLMProviderFactory;
use pdfqa_core::{Chunk, ChunkId, Document, DocumentId, PdfQaConfig, PdfQaError, Result};
use pdfqa_parser::{extract_document, DocumentSource, FileSource};
use pdfqa_vector::{
    build_chunk_plan, create_embedding_provider, rank_with_summary, BatchConfig, Chunker,
    ChunkerConfig, ChunkingStrategy, Embedder, RankingSummary,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::ContextAssembler;
use crate::session::DocumentSet;
use crate::synthesizer::{AnswerSynthesizer, OutputShape};

/// Retrieval knobs that stay fixed for the lifetime of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunker: ChunkerConfig,
    pub top_k: usize,
    pub annotate_context: bool,
    pub min_score: Option<f32>,
}

impl PipelineSettings {
    pub fn from_config(config: &PdfQaConfig) -> Result<Self> {
        Ok(Self {
            chunker: ChunkerConfig::from_config(&config.chunking)?,
            top_k: config.retrieval.top_k,
            annotate_context: config.retrieval.annotate_context,
            min_score: config.retrieval.min_score,
        })
    }
}

/// Per-request overrides of [`PipelineSettings`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub strategy: Option<ChunkingStrategy>,
    pub top_k: Option<usize>,
    pub output: OutputShape,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub question: String,
    pub options: RequestOptions,
}

impl AnalysisRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.options.strategy = Some(strategy);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.options.top_k = Some(k);
        self
    }

    pub fn output(mut self, shape: OutputShape) -> Self {
        self.options.output = shape;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReference {
    pub document_id: DocumentId,
    pub page: Option<usize>,
    pub chunk_id: ChunkId,
    pub score: f32,
}

impl From<&Chunk> for SourceReference {
    fn from(chunk: &Chunk) -> Self {
        Self {
            document_id: chunk.document_id.clone(),
            page: chunk.page,
            chunk_id: chunk.id,
            score: chunk.score.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub extract_ms: u64,
    pub chunk_ms: u64,
    pub embed_ms: u64,
    pub rank_ms: u64,
    pub synthesize_ms: u64,
    pub total_ms: u64,
}

/// Ranked chunks for a question, before any generation.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub chunks: Vec<Chunk>,
    pub summary: RankingSummary,
    pub chunks_produced: usize,
    pub embedding_failures: usize,
    pub steps: Vec<String>,
    pub timings: StageTimings,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub answer: String,
    /// Whether `answer` is HTML
    pub html: bool,
    /// Human-readable trace of completed stages; advisory only
    pub steps: Vec<String>,
    pub chunks_produced: usize,
    pub chunks_used: usize,
    pub average_similarity: f32,
    pub sources: Vec<SourceReference>,
    pub timings: StageTimings,
}

fn millis(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Extract, Chunk, Embed and Rank. Holds no per-request state.
pub struct Retriever {
    source: Arc<dyn DocumentSource>,
    embedder: Embedder,
    settings: PipelineSettings,
    /// Dedicated pool for chunk construction; rayon's global pool when unset
    chunk_pool: Option<Arc<ThreadPool>>,
}

impl Retriever {
    pub fn new(source: Arc<dyn DocumentSource>, embedder: Embedder, settings: PipelineSettings) -> Self {
        Self {
            source,
            embedder,
            settings,
            chunk_pool: None,
        }
    }

    /// Runs chunk construction on its own pool of `threads` workers.
    pub fn with_chunk_threads(mut self, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pdfqa-chunk-{}", i))
            .build()
            .map_err(|e| PdfQaError::config(format!("failed to build chunking pool: {}", e)))?;
        self.chunk_pool = Some(Arc::new(pool));
        Ok(self)
    }

    /// Worker count of the dedicated chunking pool, if one was configured.
    pub fn chunk_threads(&self) -> Option<usize> {
        self.chunk_pool.as_ref().map(|pool| pool.current_num_threads())
    }

    pub fn from_config(config: &PdfQaConfig) -> Result<Self> {
        let provider = create_embedding_provider(&config.embedding)?;
        let embedder = Embedder::with_config(
            provider,
            BatchConfig::from_config(&config.embedding, &config.performance),
        );
        Self::new(
            Arc::new(FileSource::new()),
            embedder,
            PipelineSettings::from_config(config)?,
        )
        .with_chunk_threads(config.performance.num_threads)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[instrument(skip(self, snapshot, request), fields(documents = snapshot.len()))]
    pub async fn retrieve(&self, snapshot: &DocumentSet, request: &AnalysisRequest) -> Result<Retrieval> {
        let mut steps = Vec::new();
        let mut timings = StageTimings::default();

        // An invalid window must surface before any extraction or embedding work.
        let mut chunker_config = self.settings.chunker.clone();
        if let Some(strategy) = request.options.strategy {
            chunker_config.strategy = strategy;
        }
        let chunker = Chunker::new(chunker_config)?;
        let top_k = request.options.top_k.unwrap_or(self.settings.top_k);
        if top_k == 0 {
            return Err(PdfQaError::invalid_input("top_k must be greater than 0"));
        }

        let stage = Instant::now();
        let documents = self.extract_all(snapshot).await;
        timings.extract_ms = millis(stage);
        let pages: usize = documents.iter().map(Document::page_count).sum();
        info!("Extracted {} pages from {} document(s)", pages, documents.len());
        steps.push(format!(
            "Extracted {} pages from {} document(s)",
            pages,
            documents.len()
        ));

        let stage = Instant::now();
        let document_count = documents.len();
        let plan_chunker = chunker.clone();
        let pool = self.chunk_pool.clone();
        let plan = tokio::task::spawn_blocking(move || match pool {
            Some(pool) => pool.install(|| build_chunk_plan(&documents, &plan_chunker)),
            None => build_chunk_plan(&documents, &plan_chunker),
        })
        .await
        .map_err(|e| PdfQaError::External(format!("chunking task failed: {}", e)))?;
        timings.chunk_ms = millis(stage);
        if plan.chunks.is_empty() {
            return Err(PdfQaError::no_content(format!(
                "no extractable text in {} document(s)",
                document_count
            )));
        }
        let chunks_produced = plan.chunks.len();
        steps.push(format!(
            "Split text into {} {} chunks ({} dropped as too short)",
            chunks_produced,
            chunker.strategy().name(),
            plan.stats.chunks_dropped
        ));

        let stage = Instant::now();
        let query = self.embedder.embed(&request.question).await;
        let mut chunks = plan.chunks;
        let metrics = self.embedder.embed_chunks(&mut chunks).await;
        timings.embed_ms = millis(stage);
        steps.push(format!(
            "Embedded {} chunks with {} ({} failed)",
            metrics.texts_processed, metrics.provider_name, metrics.failures
        ));

        let stage = Instant::now();
        let (ranked, summary) = rank_with_summary(chunks, &query, top_k, self.settings.min_score);
        timings.rank_ms = millis(stage);
        steps.push(format!(
            "Selected top {} of {} chunks (average similarity {:.3})",
            summary.selected, summary.candidates, summary.average_score
        ));

        Ok(Retrieval {
            chunks: ranked,
            summary,
            chunks_produced,
            embedding_failures: metrics.failures,
            steps,
            timings,
        })
    }

    /// One blocking task per document; results come back in upload order.
    async fn extract_all(&self, snapshot: &DocumentSet) -> Vec<Document> {
        let handles: Vec<_> = snapshot
            .documents()
            .iter()
            .map(|handle| {
                let source = Arc::clone(&self.source);
                let path = handle.path.clone();
                tokio::task::spawn_blocking(move || extract_document(source.as_ref(), &path))
            })
            .collect();

        let mut documents = Vec::with_capacity(handles.len());
        for (task, handle) in handles.into_iter().zip(snapshot.documents()) {
            match task.await {
                Ok(document) => {
                    debug!("{}: {} pages", document.id, document.page_count());
                    documents.push(document);
                }
                Err(e) => {
                    warn!("Extraction task for {} failed: {}", handle.id, e);
                    documents.push(Document::empty(handle.id.clone()));
                }
            }
        }
        documents
    }
}

/// The full question-answering pipeline:
/// Extract -> Chunk -> Embed -> Rank -> Assemble -> Synthesize.
pub struct Pipeline {
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl Pipeline {
    pub fn new(retriever: Retriever, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            retriever,
            synthesizer,
        }
    }

    pub fn from_config(config: &PdfQaConfig) -> Result<Self> {
        let retriever = Retriever::from_config(config)?;
        let llm = LLMProviderFactory::create_from_config(&config.llm)
            .map_err(|e| PdfQaError::config(format!("{:#}", e)))?;
        let synthesizer =
            AnswerSynthesizer::new(llm, LLMProviderFactory::generation_config(&config.llm));
        Ok(Self::new(retriever, synthesizer))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn retrieve(&self, snapshot: &DocumentSet, request: &AnalysisRequest) -> Result<Retrieval> {
        self.retriever.retrieve(snapshot, request).await
    }

    #[instrument(skip(self, snapshot, request), fields(documents = snapshot.len()))]
    pub async fn analyze(&self, snapshot: &DocumentSet, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        info!("Analysis {} started: {:?}", request_id, request.question);

        let Retrieval {
            chunks,
            summary,
            chunks_produced,
            mut steps,
            mut timings,
            ..
        } = self.retriever.retrieve(snapshot, request).await?;

        let context = ContextAssembler::new(self.retriever.settings.annotate_context).assemble(&chunks);
        steps.push(format!(
            "Assembled {} characters of context from {} chunks",
            context.len(),
            chunks.len()
        ));

        let stage = Instant::now();
        let answer = self
            .synthesizer
            .synthesize(&context, &request.question, request.options.output)
            .await?;
        timings.synthesize_ms = millis(stage);
        steps.push(format!("Generated answer with {}", answer.model));

        timings.total_ms = millis(started);
        info!(
            "Analysis {} finished in {}ms ({} of {} chunks used)",
            request_id, timings.total_ms, summary.selected, chunks_produced
        );

        Ok(AnalysisReport {
            request_id,
            answer: answer.text,
            html: answer.html,
            steps,
            chunks_produced,
            chunks_used: summary.selected,
            average_similarity: summary.average_score,
            sources: chunks.iter().map(SourceReference::from).collect(),
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_sizes_chunk_pool() {
        let mut config = PdfQaConfig::default();
        config.embedding.provider = "hash".to_string();
        config.performance.num_threads = 3;

        let retriever = Retriever::from_config(&config).unwrap();
        assert_eq!(retriever.chunk_threads(), Some(3));
    }

    #[test]
    fn test_zero_threads_clamped_to_one() {
        let mut config = PdfQaConfig::default();
        config.embedding.provider = "hash".to_string();
        config.performance.num_threads = 0;

        let retriever = Retriever::from_config(&config).unwrap();
        assert_eq!(retriever.chunk_threads(), Some(1));
    }
}
