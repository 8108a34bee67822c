use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensionality of every embedding vector flowing through the pipeline
/// (text-embedding-3-small).
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Chunks whose trimmed text is shorter than this are dropped.
pub const MIN_CHUNK_CHARS: usize = 50;

pub type ChunkId = usize;

/// Identifier of a source document, usually its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number within the source document.
    pub number: usize,
    pub text: String,
}

impl Page {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            pages,
        }
    }

    /// A document that could not be read. Keeps the id so the failure
    /// stays attributable downstream.
    pub fn empty(id: impl Into<DocumentId>) -> Self {
        Self::new(id, Vec::new())
    }

    /// Builds pages 1..=n from raw page texts.
    pub fn from_page_texts<I, S>(id: impl Into<DocumentId>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Page::new(idx + 1, text))
            .collect();
        Self::new(id, pages)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_content(&self) -> bool {
        self.pages.iter().any(|p| !p.is_blank())
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A bounded span of a document's text treated as one retrieval unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub page: Option<usize>,
    /// Offset of the first unit within the page text as extracted: a word
    /// index into its whitespace-separated words for word windows, a char
    /// index otherwise. `text` is the sanitized form of that span.
    pub start: usize,
    /// Exclusive end offset. Always greater than `start`.
    pub end: usize,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub score: Option<f32>,
}

impl Chunk {
    pub fn new(
        id: ChunkId,
        document_id: DocumentId,
        page: Option<usize>,
        start: usize,
        end: usize,
        text: String,
    ) -> Self {
        debug_assert!(end > start, "chunk end offset must exceed start");
        Self {
            id,
            document_id,
            page,
            start,
            end,
            text,
            embedding: None,
            score: None,
        }
    }

    pub fn len_units(&self) -> usize {
        self.end - self.start
    }

    /// Human-readable provenance, e.g. `annual-report.pdf p.12 #4`.
    pub fn provenance(&self) -> String {
        match self.page {
            Some(page) => format!("{} p.{} #{}", self.document_id, page, self.id),
            None => format!("{} #{}", self.document_id, self.id),
        }
    }
}

/// The "embedding failed" sentinel: never null, always scores 0.0.
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

pub fn is_zero_vector(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}
