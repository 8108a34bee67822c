use pdfqa_core::{Document, PdfQaError};
use pdfqa_vector::{
    build_chunk_plan, sanitize, Chunker, ChunkerConfig, ChunkingStrategy, SanitizeMode,
};

fn word_chunker(size: usize, overlap: usize) -> Chunker {
    Chunker::new(
        ChunkerConfig::new(ChunkingStrategy::WordWindow { size, overlap }).min_chunk_chars(0),
    )
    .unwrap()
}

/// Rebuilds the unit sequence from chunk offsets, skipping overlap.
fn reconstruct_words(chunks: &[pdfqa_core::Chunk]) -> Vec<String> {
    let mut out = Vec::new();
    let mut previous_end = 0;
    for chunk in chunks {
        let words: Vec<&str> = chunk.text.split(' ').collect();
        assert_eq!(words.len(), chunk.end - chunk.start);
        let from = chunk.start.max(previous_end);
        out.extend(words[from - chunk.start..].iter().map(|w| w.to_string()));
        previous_end = chunk.end;
    }
    out
}

#[test]
fn test_word_windows_reconstruct_source() {
    let source: Vec<String> = (0..137).map(|i| format!("w{}", i)).collect();
    let text = source.join(" ");

    for (size, overlap) in [(1, 0), (5, 1), (5, 4), (10, 3), (100, 50), (200, 10)] {
        let plan = build_chunk_plan(
            &[Document::from_page_texts("doc.pdf", [text.as_str()])],
            &word_chunker(size, overlap),
        );
        assert_eq!(
            reconstruct_words(&plan.chunks),
            source,
            "window {}/{}",
            size,
            overlap
        );
        for pair in plan.chunks.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, size - overlap);
        }
        assert!(plan.chunks.iter().all(|c| c.end > c.start));
    }
}

/// Same as `reconstruct_words`, but reads the spans back out of the raw
/// page characters.
fn reconstruct_chars(chunks: &[pdfqa_core::Chunk], source: &[char]) -> String {
    let mut out = String::new();
    let mut previous_end = 0;
    for chunk in chunks {
        let from = chunk.start.max(previous_end);
        out.extend(&source[from..chunk.end]);
        previous_end = chunk.end;
    }
    out
}

#[test]
fn test_char_windows_reconstruct_raw_page_text() {
    // whitespace runs are at most two long, so every window of 3+ chars keeps some text
    let page = "Revenue  grew\n\n10% in Q1.\tRisks include currency exposure,\r\nhedged\u{7} partly. \
                Margins fell  to 31% on higher input costs.";
    let chars: Vec<char> = page.chars().collect();

    for (size, overlap) in [(3, 0), (5, 1), (7, 3), (50, 10), (400, 5)] {
        let chunker = Chunker::new(
            ChunkerConfig::new(ChunkingStrategy::CharWindow { size, overlap }).min_chunk_chars(0),
        )
        .unwrap();
        let plan = build_chunk_plan(&[Document::from_page_texts("doc.pdf", [page])], &chunker);

        assert_eq!(
            reconstruct_chars(&plan.chunks, &chars),
            page,
            "window {}/{}",
            size,
            overlap
        );
        assert_eq!(plan.chunks.last().unwrap().end, chars.len());
        for chunk in &plan.chunks {
            let span: String = chars[chunk.start..chunk.end].iter().collect();
            assert_eq!(chunk.text, sanitize(&span, SanitizeMode::AsciiFastPath));
        }
    }
}

#[test]
fn test_page_chunks_cover_whole_page() {
    let chunker = Chunker::new(ChunkerConfig::new(ChunkingStrategy::Page).min_chunk_chars(0)).unwrap();
    let pages = ["  Revenue grew\n\n10% in Q1.  ", "Risks include\tcurrency exposure."];
    let plan = build_chunk_plan(&[Document::from_page_texts("doc.pdf", pages)], &chunker);

    assert_eq!(plan.chunks.len(), 2);
    for (chunk, page) in plan.chunks.iter().zip(pages) {
        assert_eq!((chunk.start, chunk.end), (0, page.chars().count()));
    }
    assert_eq!(plan.chunks[0].text, "Revenue grew 10% in Q1.");
    assert_eq!(plan.chunks[1].text, "Risks include currency exposure.");
}

#[test]
fn test_multi_document_pool_has_contiguous_ids() {
    let chunker = Chunker::new(ChunkerConfig::new(ChunkingStrategy::Page).min_chunk_chars(0)).unwrap();
    let first = Document::from_page_texts("a.pdf", ["one", "two", "three"]);
    let second = Document::from_page_texts("b.pdf", ["four", "five", "six"]);

    let plan = build_chunk_plan(&[first, second], &chunker);

    assert_eq!(plan.chunks.len(), 6);
    let ids: Vec<usize> = plan.chunks.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert!(plan.chunks[..3].iter().all(|c| c.document_id.as_str() == "a.pdf"));
    assert!(plan.chunks[3..].iter().all(|c| c.document_id.as_str() == "b.pdf"));
    assert_eq!(plan.chunks[4].text, "five");
    assert_eq!(plan.chunks[4].page, Some(2));
    assert_eq!(plan.stats.documents, 2);
    assert_eq!(plan.stats.pages, 6);
    assert_eq!(plan.stats.chunks_produced, 6);
}

#[test]
fn test_min_length_filter() {
    let chunker = Chunker::new(ChunkerConfig::new(ChunkingStrategy::Page)).unwrap();
    let short = "0123456789";
    let long = "a".repeat(60);
    let doc = Document::from_page_texts("f.pdf", [short.to_string(), long.clone()]);

    let plan = build_chunk_plan(&[doc], &chunker);

    assert_eq!(plan.chunks.len(), 1);
    assert_eq!(plan.chunks[0].text, long);
    assert_eq!(plan.chunks[0].id, 0);
    assert_eq!(plan.chunks[0].page, Some(2));
    assert_eq!(plan.stats.chunks_dropped, 1);
}

#[test]
fn test_invalid_window_fails_at_construction() {
    let err = Chunker::new(ChunkerConfig::new(ChunkingStrategy::WordWindow {
        size: 50,
        overlap: 50,
    }))
    .unwrap_err();
    assert!(matches!(err, PdfQaError::Configuration(_)));
}

#[test]
fn test_empty_documents_produce_empty_pool() {
    let plan = build_chunk_plan(
        &[Document::empty("broken.pdf"), Document::from_page_texts("blank.pdf", ["", "  "])],
        &word_chunker(5, 1),
    );
    assert!(plan.chunks.is_empty());
    assert_eq!(plan.stats.pages, 2);
}
