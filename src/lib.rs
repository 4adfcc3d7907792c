//! Document retrieval pipeline.
//!
//! Documents are extracted to text, split into overlapping chunks, embedded
//! and kept in an in-memory vector index. Queries are answered by retrieving
//! the most similar chunks and handing them to a text generator as context.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod documents;
pub mod logging;
pub mod openai;
pub mod pipeline;
pub mod retrieval;
#[cfg(feature = "http-server")]
pub mod server;
pub mod services;
pub mod vector;

pub use config::Settings;
pub use corpus::{DocumentCorpus, FsCorpus};
pub use documents::{Chunker, Document, DocumentFormat, Extractor, SentenceChunker};
pub use pipeline::{DocumentProcessor, Reindexer};
pub use retrieval::{RetrievalOrchestrator, TextGenerator};
pub use services::Services;
pub use vector::{EmbeddingGenerator, IndexHandle, VectorIndex};
