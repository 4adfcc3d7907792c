//! Single-document ingestion: extract, chunk, embed, store, append.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::corpus::{CorpusError, DocumentCorpus};
use crate::documents::{
    Chunker, ChunkingConfig, Document, ExtractError, Extractor, SentenceChunker,
};
use crate::vector::{
    EmbeddedDocument, EmbeddingError, EmbeddingGenerator, IndexError, IndexHandle, embed_all,
};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Document {0} produced no chunks")]
    NoChunks(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// Outcome of ingesting one document into the live index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_name: String,
    pub chunks_indexed: usize,
    /// Where the corpus stored the document
    pub uri: String,
}

/// Turns raw documents into embedded chunks.
pub struct DocumentProcessor {
    extractor: Extractor,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingGenerator>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl DocumentProcessor {
    pub fn new(
        embedder: Arc<dyn EmbeddingGenerator>,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            extractor: Extractor::new(),
            chunker: Arc::new(SentenceChunker::new()),
            embedder,
            chunking,
            batch_size: batch_size.max(1),
        }
    }

    /// Replace the chunking strategy.
    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingGenerator> {
        &self.embedder
    }

    /// Dimensionality of the vectors this processor produces.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Extract, chunk and embed a document without touching any index.
    pub fn process(&self, document: &Document) -> Result<EmbeddedDocument, IngestError> {
        let text = self.extractor.extract(document)?;

        let chunks: Vec<String> = self
            .chunker
            .chunk(&text, &self.chunking)
            .into_iter()
            .map(|chunk| chunk.content)
            .collect();
        if chunks.is_empty() {
            return Err(IngestError::NoChunks(document.name.clone()));
        }
        crate::debug_event!(
            "chunker",
            "split",
            "{}: {} chars -> {} chunks",
            document.name,
            text.chars().count(),
            chunks.len()
        );

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let vectors = embed_all(self.embedder.as_ref(), &texts, self.batch_size)?;

        Ok(EmbeddedDocument::new(document.name.clone(), chunks, vectors))
    }

    /// Process `document`, store it in `corpus` and append it to the live
    /// index of `handle`.
    ///
    /// The name stays claimed on the handle until this returns, so a
    /// concurrent upload of the same name fails with `DuplicateDocument`
    /// before touching the corpus. Nothing is stored when processing fails,
    /// and the index is left untouched on any failure.
    pub fn ingest(
        &self,
        handle: &Arc<IndexHandle>,
        corpus: &dyn DocumentCorpus,
        document: &Document,
    ) -> Result<IngestReport, IngestError> {
        let duplicate = || IngestError::from(IndexError::DuplicateDocument(document.name.clone()));

        let _claim = handle
            .try_claim_document(&document.name)
            .ok_or_else(duplicate)?;
        if handle.current().contains_document(&document.name) {
            return Err(duplicate());
        }

        let embedded = self.process(document)?;
        let uri = corpus.store(&document.name, &document.bytes)?;
        let chunks_indexed = handle.current().add(vec![embedded])?;

        crate::log_event!(
            "ingest",
            "indexed",
            "{} ({chunks_indexed} chunks)",
            document.name
        );

        Ok(IngestReport {
            document_name: document.name.clone(),
            chunks_indexed,
            uri,
        })
    }
}
