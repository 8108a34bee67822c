use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfQaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("No usable content: {0}")]
    NoContent(String),

    #[error("No document uploaded yet")]
    NoDocuments,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PdfQaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    pub fn no_content(msg: impl Into<String>) -> Self {
        Self::NoContent(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the pipeline failed outright, as opposed to rejecting the request.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            Self::Synthesis(_) | Self::NoContent(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PdfQaError>;
