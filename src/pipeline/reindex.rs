//! Full rebuild of the index from the document corpus.
//!
//! Documents are fetched and processed in parallel, then appended to a
//! fresh index in corpus order. One document failing never aborts the
//! rebuild; it is logged and reported. The finished index is published
//! through [`IndexHandle`] in a single swap.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::ingest::{DocumentProcessor, IngestError};
use crate::corpus::{CorpusError, DocumentCorpus};
use crate::documents::{Document, DocumentFormat};
use crate::vector::{EmbeddedDocument, IndexHandle, VectorIndex};

#[derive(Error, Debug)]
pub enum ReindexError {
    #[error("A reindex is already in progress")]
    InProgress,

    #[error("Failed to list corpus: {0}")]
    Corpus(#[from] CorpusError),
}

/// A document that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub document: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    /// Documents with a supported format that were attempted
    pub documents_attempted: usize,
    pub documents_indexed: usize,
    /// Files in the corpus with an unsupported extension
    pub documents_skipped: usize,
    pub failures: Vec<FailedDocument>,
    pub total_chunks: usize,
    /// Whether the rebuilt index replaced the live one
    pub published: bool,
}

pub struct Reindexer {
    processor: Arc<DocumentProcessor>,
    corpus: Arc<dyn DocumentCorpus>,
}

impl Reindexer {
    pub fn new(processor: Arc<DocumentProcessor>, corpus: Arc<dyn DocumentCorpus>) -> Self {
        Self { processor, corpus }
    }

    /// Build a new index from every supported document in the corpus.
    pub fn rebuild(&self) -> Result<(VectorIndex, ReindexReport), ReindexError> {
        let names = self.corpus.list()?;
        let (supported, unsupported): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| DocumentFormat::from_name(name).is_some());

        for name in &unsupported {
            crate::debug_event!("reindex", "skipped", "unsupported file {name}");
        }

        let mut report = ReindexReport {
            documents_attempted: supported.len(),
            documents_skipped: unsupported.len(),
            ..ReindexReport::default()
        };
        crate::log_event!(
            "reindex",
            "started",
            "{} documents from {}",
            supported.len(),
            self.corpus.location()
        );

        // Processing order is parallel; collected results keep corpus order.
        let outcomes: Vec<(String, Result<EmbeddedDocument, IngestError>)> = supported
            .into_par_iter()
            .map(|name| {
                let outcome = self.load_and_process(&name);
                (name, outcome)
            })
            .collect();

        let index = VectorIndex::new(self.processor.dimension());
        for (name, outcome) in outcomes {
            let appended = outcome.and_then(|doc| index.add(vec![doc]).map_err(IngestError::from));
            match appended {
                Ok(chunks) => {
                    report.documents_indexed += 1;
                    report.total_chunks += chunks;
                }
                Err(e) => {
                    tracing::warn!(target: "reindex", "failed to index {name}: {e}");
                    report.failures.push(FailedDocument {
                        document: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        crate::log_event!(
            "reindex",
            "finished",
            "{}/{} documents, {} chunks",
            report.documents_indexed,
            report.documents_attempted,
            report.total_chunks
        );

        Ok((index, report))
    }

    fn load_and_process(&self, name: &str) -> Result<EmbeddedDocument, IngestError> {
        let bytes = self.corpus.fetch(name)?;
        self.processor.process(&Document::new(name, bytes))
    }

    /// Rebuild and publish, holding the handle's single reindex slot.
    ///
    /// When no document could be indexed the live index is kept and the
    /// report carries `published: false`.
    pub fn run(&self, handle: &Arc<IndexHandle>) -> Result<ReindexReport, ReindexError> {
        let guard = handle
            .try_begin_reindex()
            .ok_or(ReindexError::InProgress)?;

        let (index, mut report) = self.rebuild()?;

        if report.documents_indexed > 0 {
            guard.publish(index);
            report.published = true;
        } else {
            tracing::warn!(
                target: "reindex",
                "no documents were processed, keeping the current index"
            );
        }

        Ok(report)
    }
}
