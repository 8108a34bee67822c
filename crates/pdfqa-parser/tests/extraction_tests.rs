use pdfqa_parser::{extract_document, DocumentSource, FileSource};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_text_file_pages_keep_alignment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filing.txt");
    fs::write(
        &path,
        "Revenue grew 10% in Q1.\u{c}\u{c}Risks include currency exposure.",
    )
    .unwrap();

    let doc = extract_document(&FileSource::new(), &path);

    assert_eq!(doc.id.as_str(), "filing.txt");
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.pages[0].text, "Revenue grew 10% in Q1.");
    assert!(doc.pages[1].is_blank());
    assert_eq!(doc.pages[2].number, 3);
}

#[test]
fn test_corrupt_pdf_yields_empty_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

    let doc = extract_document(&FileSource::new(), &path);

    assert_eq!(doc.id.as_str(), "broken.pdf");
    assert!(doc.pages.is_empty());
    assert!(!doc.has_content());
}

#[test]
fn test_missing_file_yields_empty_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.pdf");

    assert!(FileSource::new().open(&path).is_err());
    let doc = extract_document(&FileSource::new(), &path);
    assert!(doc.pages.is_empty());
}
