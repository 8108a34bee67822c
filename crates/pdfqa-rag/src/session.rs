use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use pdfqa_core::{DocumentId, PdfQaError, Result};
use pdfqa_parser::document_id_for;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::pipeline::{AnalysisReport, AnalysisRequest, Pipeline, RequestOptions};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentHandle {
    pub id: DocumentId,
    pub path: PathBuf,
}

impl DocumentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: document_id_for(&path),
            path,
        }
    }
}

/// The documents one analysis runs over. Immutable once built; a new
/// upload produces a new set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentSet {
    documents: Vec<DocumentHandle>,
    uploaded_at: Option<DateTime<Utc>>,
}

impl DocumentSet {
    pub fn new(documents: Vec<DocumentHandle>) -> Self {
        Self {
            documents,
            uploaded_at: Some(Utc::now()),
        }
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new(paths.into_iter().map(DocumentHandle::new).collect())
    }

    pub fn documents(&self) -> &[DocumentHandle] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.uploaded_at
    }
}

/// A question is either free text or the key of a configured preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    Custom(String),
    Preset(String),
}

/// Holds the current document set. Uploads swap the whole set atomically;
/// a request that already took a snapshot keeps working on it.
pub struct Session {
    documents: ArcSwap<DocumentSet>,
    presets: BTreeMap<String, String>,
    pipeline: Arc<Pipeline>,
}

impl Session {
    pub fn new(pipeline: Arc<Pipeline>, presets: BTreeMap<String, String>) -> Self {
        Self {
            documents: ArcSwap::from_pointee(DocumentSet::default()),
            presets,
            pipeline,
        }
    }

    /// Replaces the current document set.
    pub fn upload<I, P>(&self, paths: I) -> Result<Arc<DocumentSet>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut handles = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(PdfQaError::invalid_input(format!(
                    "File not found: {}",
                    path.display()
                )));
            }
            handles.push(DocumentHandle::new(path));
        }
        if handles.is_empty() {
            return Err(PdfQaError::invalid_input("No files provided"));
        }

        let set = Arc::new(DocumentSet::new(handles));
        self.documents.store(Arc::clone(&set));
        info!("Uploaded {} document(s)", set.len());
        Ok(set)
    }

    pub fn snapshot(&self) -> Arc<DocumentSet> {
        self.documents.load_full()
    }

    pub fn clear(&self) {
        self.documents.store(Arc::new(DocumentSet::default()));
    }

    pub fn presets(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Turns a question into the text sent down the pipeline.
    pub fn resolve(&self, question: &Question) -> Result<String> {
        match question {
            Question::Custom(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(PdfQaError::invalid_input("Custom query cannot be empty"));
                }
                Ok(text.to_string())
            }
            Question::Preset(key) => self
                .presets
                .get(key)
                .map(|prompt| prompt.trim().to_string())
                .ok_or_else(|| PdfQaError::invalid_input(format!("Invalid prompt key: {}", key))),
        }
    }

    pub async fn ask(&self, question: Question) -> Result<AnalysisReport> {
        self.ask_with(question, RequestOptions::default()).await
    }

    pub async fn ask_with(
        &self,
        question: Question,
        options: RequestOptions,
    ) -> Result<AnalysisReport> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Err(PdfQaError::NoDocuments);
        }
        let question = self.resolve(&question)?;
        let request = AnalysisRequest::new(question).with_options(options);
        self.pipeline.analyze(&snapshot, &request).await
    }
}
