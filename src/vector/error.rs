//! Error types for the vector index and embedding collaborators.

use thiserror::Error;

/// Errors from vector index operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Document already indexed: {0}")]
    DuplicateDocument(String),

    #[error("Document {0} has no chunks")]
    EmptyDocument(String),

    #[error("Document {document} has {chunks} chunks but {vectors} vectors")]
    ChunkCountMismatch {
        document: String,
        chunks: usize,
        vectors: usize,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Errors from the embedding collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Embedding batch failed: {0}")]
    BatchFailed(String),
}
