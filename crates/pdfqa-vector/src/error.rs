use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {0}, got {1}")]
    DimensionMismatch(usize, usize),

    #[error("Batch size mismatch: sent {0} texts, received {1} vectors")]
    BatchSizeMismatch(usize, usize),

    #[error("Invalid chunk window: {0}")]
    InvalidWindow(String),

    #[error("Unknown chunking strategy: {0}")]
    UnknownStrategy(String),
}

impl From<VectorError> for pdfqa_core::PdfQaError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::InvalidWindow(_) | VectorError::UnknownStrategy(_) => {
                pdfqa_core::PdfQaError::Configuration(err.to_string())
            }
            _ => pdfqa_core::PdfQaError::Embedding(err.to_string()),
        }
    }
}
