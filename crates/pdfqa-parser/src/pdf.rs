use lopdf::Document as PdfDocument;
use pdfqa_core::{Page, PdfQaError, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::DocumentSource;

/// PDF text extractor backed by lopdf.
#[derive(Debug, Default, Clone)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract pages from an in-memory PDF (e.g. an upload body).
    pub fn open_bytes(&self, data: &[u8]) -> Result<Vec<Page>> {
        if !is_pdf(data) {
            return Err(PdfQaError::extraction("input is not a PDF (missing %PDF header)"));
        }
        let doc = PdfDocument::load_mem(data)
            .map_err(|e| PdfQaError::extraction(format!("failed to load PDF: {}", e)))?;
        Ok(Self::pages_of(&doc))
    }

    fn pages_of(doc: &PdfDocument) -> Vec<Page> {
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        debug!("PDF has {} pages", page_numbers.len());

        page_numbers
            .into_iter()
            .map(|number| {
                // A page whose content stream we cannot decode stays in place as
                // an empty page so numbering lines up with the original.
                let text = doc.extract_text(&[number]).unwrap_or_else(|e| {
                    warn!("No extractable text on page {}: {}", number, e);
                    String::new()
                });
                Page::new(number as usize, text)
            })
            .collect()
    }
}

impl DocumentSource for PdfExtractor {
    fn open(&self, path: &Path) -> Result<Vec<Page>> {
        let data = std::fs::read(path)?;
        self.open_bytes(&data)
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// Check if a file is a PDF based on its magic bytes
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
}
