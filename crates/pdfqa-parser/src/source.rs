use pdfqa_core::{Document, DocumentId, Page, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::{PdfExtractor, PlainTextSource};

/// Turns a document on disk into its ordered page texts.
pub trait DocumentSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Vec<Page>>;

    fn name(&self) -> &str;
}

/// Picks the extractor by file extension: `.txt`/`.md` are read as
/// form-feed separated pages, everything else goes through the PDF
/// extractor.
#[derive(Debug, Default, Clone)]
pub struct FileSource {
    pdf: PdfExtractor,
    text: PlainTextSource,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_plain_text(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "md" | "text"))
            .unwrap_or(false)
    }
}

impl DocumentSource for FileSource {
    fn open(&self, path: &Path) -> Result<Vec<Page>> {
        if Self::is_plain_text(path) {
            self.text.open(path)
        } else {
            self.pdf.open(path)
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Document id derived from the file name, falling back to the full path.
pub fn document_id_for(path: &Path) -> DocumentId {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
        .into()
}

/// Extracts a document without ever failing: unreadable input is logged
/// and yields a document with zero pages.
pub fn extract_document(source: &dyn DocumentSource, path: &Path) -> Document {
    let id = document_id_for(path);
    match source.open(path) {
        Ok(pages) => {
            debug!(
                "Extracted {} pages from {} via {}",
                pages.len(),
                id,
                source.name()
            );
            Document::new(id, pages)
        }
        Err(e) => {
            warn!("Could not extract text from {}: {}", path.display(), e);
            Document::empty(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::PdfQaError;
    use std::path::PathBuf;

    struct FailingSource;

    impl DocumentSource for FailingSource {
        fn open(&self, _path: &Path) -> Result<Vec<Page>> {
            Err(PdfQaError::extraction("corrupt xref table"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_extract_document_swallows_failures() {
        let doc = extract_document(&FailingSource, Path::new("/tmp/report.pdf"));
        assert_eq!(doc.id.as_str(), "report.pdf");
        assert!(doc.pages.is_empty());
    }

    #[test]
    fn test_plain_text_routing() {
        assert!(FileSource::is_plain_text(&PathBuf::from("notes.TXT")));
        assert!(FileSource::is_plain_text(&PathBuf::from("a/b/readme.md")));
        assert!(!FileSource::is_plain_text(&PathBuf::from("filing.pdf")));
        assert!(!FileSource::is_plain_text(&PathBuf::from("no_extension")));
    }
}
