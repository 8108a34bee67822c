use pdfqa_core::Chunk;

/// Joins ranked chunks into the context block handed to the generation
/// oracle. Chunks are emitted in the order given (highest score first after
/// ranking) and nothing is truncated.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    annotate: bool,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ContextAssembler {
    pub fn new(annotate: bool) -> Self {
        Self { annotate }
    }

    pub fn assemble(&self, chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|chunk| {
                if self.annotate {
                    format!("{}\n{}", annotation(chunk), chunk.text)
                } else {
                    chunk.text.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `[source: report.pdf | page 3 | chunk 7 | score 0.873]`
pub fn annotation(chunk: &Chunk) -> String {
    let page = chunk
        .page
        .map(|p| format!(" | page {}", p))
        .unwrap_or_default();
    format!(
        "[source: {}{} | chunk {} | score {:.3}]",
        chunk.document_id,
        page,
        chunk.id,
        chunk.score.unwrap_or(0.0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: usize, page: Option<usize>, text: &str, score: f32) -> Chunk {
        let mut c = Chunk::new(id, "report.pdf".into(), page, 0, 1, text.to_string());
        c.score = Some(score);
        c
    }

    #[test]
    fn test_annotated_context() {
        let chunks = vec![
            chunk(7, Some(3), "Revenue grew.", 0.8734),
            chunk(2, None, "Risks remain.", 0.25),
        ];
        let context = ContextAssembler::new(true).assemble(&chunks);
        assert_eq!(
            context,
            "[source: report.pdf | page 3 | chunk 7 | score 0.873]\nRevenue grew.\n\n\
             [source: report.pdf | chunk 2 | score 0.250]\nRisks remain."
        );
    }

    #[test]
    fn test_plain_context() {
        let chunks = vec![chunk(0, Some(1), "a", 0.9), chunk(1, Some(1), "b", 0.1)];
        assert_eq!(ContextAssembler::new(false).assemble(&chunks), "a\n\nb");
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(ContextAssembler::default().assemble(&[]), "");
    }
}
