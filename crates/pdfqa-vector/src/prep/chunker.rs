use pdfqa_core::{
    canonical_strategy_name, Chunk, ChunkingConfig, Document, DocumentId, Page, Result,
    MIN_CHUNK_CHARS,
};
use rayon::prelude::*;
use std::time::Instant;
use unicode_normalization::UnicodeNormalization;

use crate::error::VectorError;

/// How a page's text is cut into retrieval units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Sliding window of `size` words advancing by `size - overlap`.
    WordWindow { size: usize, overlap: usize },
    /// Every page is one unit.
    Page,
    /// Sliding window of `size` characters advancing by `size - overlap`.
    CharWindow { size: usize, overlap: usize },
}

impl ChunkingStrategy {
    /// Parses a strategy name (`word`, `page`, `char`) with its window.
    /// Accepts the same spellings as configuration validation.
    pub fn parse(name: &str, size: usize, overlap: usize) -> Result<Self> {
        match canonical_strategy_name(name) {
            Some("word") => Ok(Self::WordWindow { size, overlap }),
            Some("page") => Ok(Self::Page),
            Some("char") => Ok(Self::CharWindow { size, overlap }),
            _ => Err(VectorError::UnknownStrategy(name.to_string()).into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WordWindow { .. } => "word",
            Self::Page => "page",
            Self::CharWindow { .. } => "char",
        }
    }

    fn window(&self) -> Option<(usize, usize)> {
        match *self {
            Self::WordWindow { size, overlap } | Self::CharWindow { size, overlap } => {
                Some((size, overlap))
            }
            Self::Page => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Skip Unicode normalization for ASCII-only strings (fast path).
    AsciiFastPath,
    /// Always normalize via NFC.
    Strict,
}

/// Configuration knobs for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub strategy: ChunkingStrategy,
    pub min_chunk_chars: usize,
    pub sanitize_mode: SanitizeMode,
}

impl ChunkerConfig {
    pub fn new(strategy: ChunkingStrategy) -> Self {
        Self {
            strategy,
            min_chunk_chars: MIN_CHUNK_CHARS,
            sanitize_mode: SanitizeMode::AsciiFastPath,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let strategy = ChunkingStrategy::parse(&config.strategy, config.chunk_size, config.overlap)?;
        Ok(Self::new(strategy).min_chunk_chars(config.min_chunk_chars))
    }

    pub fn min_chunk_chars(mut self, min: usize) -> Self {
        self.min_chunk_chars = min;
        self
    }

    pub fn sanitize_mode(mut self, mode: SanitizeMode) -> Self {
        self.sanitize_mode = mode;
        self
    }

    /// Rejects windows that could never advance.
    pub fn validate(&self) -> Result<()> {
        if let Some((size, overlap)) = self.strategy.window() {
            if size == 0 {
                return Err(VectorError::InvalidWindow("chunk size must be positive".into()).into());
            }
            if overlap >= size {
                return Err(VectorError::InvalidWindow(format!(
                    "overlap ({}) must be smaller than chunk size ({})",
                    overlap, size
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// A validated chunker. Construction is the only place a bad window can
/// be reported, so nothing downstream runs with one.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

/// Chunks cut from one piece of text, before the length filter is
/// accounted for in the plan stats.
#[derive(Debug, Default)]
pub struct ChunkBatch {
    pub chunks: Vec<Chunk>,
    pub dropped: usize,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.config.strategy
    }

    /// Chunks a single page, tagging every chunk with its page number.
    pub fn chunk_page(&self, document_id: &DocumentId, page: &Page) -> ChunkBatch {
        self.chunk_text(document_id, Some(page.number), &page.text)
    }

    /// Chunks arbitrary text. Ids are local (`0..n`) and get replaced when
    /// batches are merged into a plan.
    ///
    /// Windows are cut over `text` as given, so `start..end` indexes into it:
    /// word positions of `text.split_whitespace()` for word windows, char
    /// positions otherwise. Only the chunk text itself is sanitized.
    pub fn chunk_text(&self, document_id: &DocumentId, page: Option<usize>, text: &str) -> ChunkBatch {
        let mode = self.config.sanitize_mode;
        let candidates: Vec<(usize, usize, String)> = match self.config.strategy {
            ChunkingStrategy::WordWindow { size, overlap } => {
                let words: Vec<&str> = text.split_whitespace().collect();
                window_spans(words.len(), size, overlap)
                    .into_iter()
                    .map(|(start, end)| (start, end, sanitize(&words[start..end].join(" "), mode)))
                    .collect()
            }
            ChunkingStrategy::CharWindow { size, overlap } => {
                let chars: Vec<char> = text.chars().collect();
                window_spans(chars.len(), size, overlap)
                    .into_iter()
                    .map(|(start, end)| {
                        let raw: String = chars[start..end].iter().collect();
                        (start, end, sanitize(&raw, mode))
                    })
                    .collect()
            }
            ChunkingStrategy::Page => {
                let len = text.chars().count();
                if len == 0 {
                    Vec::new()
                } else {
                    vec![(0, len, sanitize(text, mode))]
                }
            }
        };

        let mut batch = ChunkBatch::default();
        for (start, end, text) in candidates {
            // whitespace and control characters only
            if text.is_empty() {
                continue;
            }
            if text.chars().count() < self.config.min_chunk_chars {
                batch.dropped += 1;
                continue;
            }
            let id = batch.chunks.len();
            batch
                .chunks
                .push(Chunk::new(id, document_id.clone(), page, start, end, text));
        }
        batch
    }
}

/// `[start, end)` unit spans for a sliding window. The last window is the
/// first one that reaches `total`.
pub fn window_spans(total: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    if total == 0 || size == 0 || overlap >= size {
        return Vec::new();
    }
    let stride = size - overlap;
    let mut spans = Vec::with_capacity(total / stride + 1);
    let mut start = 0;
    loop {
        let end = (start + size).min(total);
        spans.push((start, end));
        if end == total {
            break;
        }
        start += stride;
    }
    spans
}

/// Drops non-whitespace control characters and collapses whitespace runs
/// into single spaces.
pub fn sanitize(text: &str, mode: SanitizeMode) -> String {
    let normalized: String = match mode {
        SanitizeMode::AsciiFastPath if text.is_ascii() => text.to_string(),
        _ => text.nfc().collect(),
    };

    let mut out = String::with_capacity(normalized.len());
    for word in normalized.split_whitespace() {
        let mut kept = word.chars().filter(|c| !c.is_control()).peekable();
        if kept.peek().is_none() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(kept);
    }
    out
}

/// Result of chunking a whole corpus.
#[derive(Debug)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub stats: ChunkStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub documents: usize,
    pub pages: usize,
    pub chunks_produced: usize,
    pub chunks_dropped: usize,
    pub elapsed_ms: u128,
}

/// Main entry point: chunk every page of every document in parallel and
/// merge the results into one pool in (document, page, window) order,
/// with ids `0..n`.
pub fn build_chunk_plan(documents: &[Document], chunker: &Chunker) -> ChunkPlan {
    let start_total = Instant::now();

    let pages: Vec<(&DocumentId, &Page)> = documents
        .iter()
        .flat_map(|doc| doc.pages.iter().map(move |page| (&doc.id, page)))
        .collect();

    let batches: Vec<ChunkBatch> = pages
        .par_iter()
        .map(|(doc_id, page)| chunker.chunk_page(doc_id, page))
        .collect();

    let mut stats = ChunkStats {
        documents: documents.len(),
        pages: pages.len(),
        ..ChunkStats::default()
    };

    let mut chunks = Vec::with_capacity(batches.iter().map(|b| b.chunks.len()).sum());
    for batch in batches {
        stats.chunks_dropped += batch.dropped;
        chunks.extend(batch.chunks);
    }
    for (id, chunk) in chunks.iter_mut().enumerate() {
        chunk.id = id;
    }
    stats.chunks_produced = chunks.len();
    stats.elapsed_ms = start_total.elapsed().as_millis();

    tracing::debug!(
        "Chunk plan built in {:?} ({} strategy): {} documents / {} pages -> {} chunks ({} dropped below {} chars)",
        start_total.elapsed(),
        chunker.strategy().name(),
        stats.documents,
        stats.pages,
        stats.chunks_produced,
        stats.chunks_dropped,
        chunker.config().min_chunk_chars
    );

    ChunkPlan { chunks, stats }
}
