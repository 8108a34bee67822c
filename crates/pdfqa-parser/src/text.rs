use pdfqa_core::{Page, Result};
use std::path::Path;

use crate::DocumentSource;

const FORM_FEED: char = '\u{c}';

/// Plain-text documents, one page per form-feed separated section
/// (the layout `pdftotext` produces).
#[derive(Debug, Default, Clone)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }

    pub fn pages_from_str(&self, content: &str) -> Vec<Page> {
        if content.is_empty() {
            return Vec::new();
        }
        let mut sections: Vec<&str> = content.split(FORM_FEED).collect();
        // pdftotext terminates the last page with a form feed as well
        if sections.len() > 1 && sections.last().is_some_and(|s| s.trim().is_empty()) {
            sections.pop();
        }
        sections
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Page::new(idx + 1, text))
            .collect()
    }
}

impl DocumentSource for PlainTextSource {
    fn open(&self, path: &Path) -> Result<Vec<Page>> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.pages_from_str(&content))
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_feed_splits_pages() {
        let pages = PlainTextSource::new().pages_from_str("one\u{c}\u{c}three\u{c}");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], Page::new(1, "one"));
        assert!(pages[1].is_blank());
        assert_eq!(pages[2], Page::new(3, "three"));
    }

    #[test]
    fn test_single_page_without_separator() {
        let pages = PlainTextSource::new().pages_from_str("just one page");
        assert_eq!(pages, vec![Page::new(1, "just one page")]);
    }

    #[test]
    fn test_empty_content_has_no_pages() {
        assert!(PlainTextSource::new().pages_from_str("").is_empty());
    }
}
