//! Document extraction and chunking for the retrieval pipeline.
//!
//! This module provides:
//! - Format detection by file extension
//! - Text extraction for PDF, DOCX and plain text/markdown
//! - Sentence-aware chunking with configurable size and overlap

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod types;

pub use chunker::{Chunker, SentenceChunker};
pub use config::ChunkingConfig;
pub use error::{ExtractError, ExtractResult};
pub use extract::Extractor;
pub use types::{Document, DocumentChunk, DocumentFormat, RawChunk};
