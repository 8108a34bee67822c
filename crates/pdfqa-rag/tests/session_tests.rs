use async_trait::async_trait;
use pdfqa_ai::{GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message};
use pdfqa_core::PdfQaError;
use pdfqa_parser::FileSource;
use pdfqa_rag::{
    AnswerSynthesizer, Pipeline, PipelineSettings, Question, Retriever, Session,
};
use pdfqa_vector::{ChunkerConfig, ChunkingStrategy, Embedder, HashEmbeddingProvider};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Answers with the question line it was asked, so tests can see what the
/// session resolved.
struct EchoLlm;

#[async_trait]
impl LLMProvider for EchoLlm {
    async fn generate_chat(
        &self,
        messages: &[Message],
        _config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let question = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Question: "))
            .unwrap_or("");
        Ok(LLMResponse::text(question, "echo"))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn session() -> Session {
    let retriever = Retriever::new(
        Arc::new(FileSource::new()),
        Embedder::new(Arc::new(HashEmbeddingProvider::new(64))),
        PipelineSettings {
            chunker: ChunkerConfig::new(ChunkingStrategy::Page).min_chunk_chars(0),
            top_k: 4,
            annotate_context: false,
            min_score: None,
        },
    );
    let pipeline = Pipeline::new(
        retriever,
        AnswerSynthesizer::new(Arc::new(EchoLlm), GenerationConfig::default()),
    );
    let mut presets = BTreeMap::new();
    presets.insert("Risks".to_string(), "What are the key risks?".to_string());
    Session::new(Arc::new(pipeline), presets)
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_ask_without_upload() {
    let err = session()
        .ask(Question::Custom("What happened?".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfQaError::NoDocuments));
    assert_eq!(err.to_string(), "No document uploaded yet");
}

#[tokio::test]
async fn test_question_resolution() {
    let dir = TempDir::new().unwrap();
    let session = session();
    session
        .upload([write(&dir, "a.txt", "Currency exposure is the main risk.")])
        .unwrap();

    let err = session.ask(Question::Custom("   ".into())).await.unwrap_err();
    assert!(matches!(err, PdfQaError::InvalidInput(_)));

    let err = session
        .ask(Question::Preset("Valuation".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfQaError::InvalidInput(ref m) if m.contains("Invalid prompt key")));

    let report = session.ask(Question::Preset("Risks".into())).await.unwrap();
    assert_eq!(report.answer, "What are the key risks?");

    let report = session
        .ask(Question::Custom("  Why did margins fall?  ".into()))
        .await
        .unwrap();
    assert_eq!(report.answer, "Why did margins fall?");
}

#[tokio::test]
async fn test_upload_swaps_set_without_touching_snapshots() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "first.txt", "first document");
    let second = write(&dir, "second.txt", "second document");
    let session = session();

    session.upload([&first]).unwrap();
    let before = session.snapshot();
    session.upload([&second]).unwrap();
    let after = session.snapshot();

    assert_eq!(before.len(), 1);
    assert_eq!(before.documents()[0].id.as_str(), "first.txt");
    assert_eq!(after.documents()[0].id.as_str(), "second.txt");
    assert!(!Arc::ptr_eq(&before, &after));
}

#[test]
fn test_upload_rejects_missing_files() {
    let dir = TempDir::new().unwrap();
    let session = session();
    let err = session.upload([dir.path().join("nope.pdf")]).unwrap_err();
    assert!(matches!(err, PdfQaError::InvalidInput(_)));
    assert!(session.snapshot().is_empty());

    let none: [std::path::PathBuf; 0] = [];
    assert!(session.upload(none).is_err());
}
