pub mod embedder;
pub mod error;
pub mod factory;
pub mod hash_provider;
pub mod prep;
pub mod providers;
pub mod ranker;

#[cfg(feature = "openai")]
pub mod openai_provider;

pub use embedder::*;
pub use factory::*;
pub use hash_provider::*;
pub use prep::chunker::*;
pub use providers::*;
pub use ranker::*;

#[cfg(feature = "openai")]
pub use openai_provider::*;

pub use error::VectorError;
pub use pdfqa_core::{Chunk, ChunkId, PdfQaError, Result};
