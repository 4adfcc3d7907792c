//! In-memory vector index over document chunks.
//!
//! Entries are append-only: `add` validates a whole batch, then pushes it
//! under a short write lock. Searches take a read lock and never see a
//! partially appended batch. Replacing the whole index is the job of
//! [`IndexHandle`](super::handle::IndexHandle).

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{IndexError, IndexResult};
use super::similarity::{l2_norm, rank_entries};
use crate::documents::DocumentChunk;

/// Provenance of an index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub document_name: String,
    pub chunk_index: usize,
    pub processed_at: DateTime<Utc>,
}

/// A stored chunk with its embedding. Immutable once inserted.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub(crate) content: String,
    pub(crate) vector: Vec<f32>,
    /// L2 norm of `vector`, computed at insertion.
    pub(crate) norm: f32,
    pub(crate) metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }
}

/// A fully embedded document, ready to be appended to an index.
///
/// `chunks[i]` is embedded as `vectors[i]`; chunk indexes are assigned from
/// that order.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub name: String,
    pub chunks: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub processed_at: DateTime<Utc>,
}

impl EmbeddedDocument {
    pub fn new(name: impl Into<String>, chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            name: name.into(),
            chunks,
            vectors,
            processed_at: Utc::now(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub content: String,
    pub similarity: f32,
    pub document_name: String,
    pub chunk_index: usize,
    pub processed_at: DateTime<Utc>,
}

impl SearchHit {
    fn from_entry(entry: &IndexEntry, similarity: f32) -> Self {
        Self {
            content: entry.content.clone(),
            similarity,
            document_name: entry.metadata.document_name.clone(),
            chunk_index: entry.metadata.chunk_index,
            processed_at: entry.metadata.processed_at,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<IndexEntry>,
    /// Document name to the range of its entries. Each document's chunks are
    /// appended contiguously by a single `add`.
    documents: HashMap<String, Range<usize>>,
    /// Document names in first-insertion order.
    order: Vec<String>,
}

/// Brute-force cosine similarity index with a fixed dimensionality.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of entries (chunks) in the index.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.state.read().order.len()
    }

    /// Names of indexed documents, in the order they were first added.
    pub fn document_names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }

    pub fn contains_document(&self, name: &str) -> bool {
        self.state.read().documents.contains_key(name)
    }

    /// All chunks of one document ordered by chunk index.
    pub fn document_chunks(&self, name: &str) -> Option<Vec<DocumentChunk>> {
        let state = self.state.read();
        let range = state.documents.get(name)?.clone();
        Some(
            state.entries[range]
                .iter()
                .map(|entry| DocumentChunk {
                    document_name: entry.metadata.document_name.clone(),
                    chunk_index: entry.metadata.chunk_index,
                    content: entry.content.clone(),
                })
                .collect(),
        )
    }

    /// Append a batch of embedded documents.
    ///
    /// The batch is validated in full first; on any error nothing is
    /// appended. Returns the number of entries added.
    pub fn add(&self, documents: Vec<EmbeddedDocument>) -> IndexResult<usize> {
        self.validate_batch(&documents)?;

        let mut state = self.state.write();

        if let Some(existing) = documents
            .iter()
            .find(|doc| state.documents.contains_key(&doc.name))
        {
            return Err(IndexError::DuplicateDocument(existing.name.clone()));
        }

        let added: usize = documents.iter().map(EmbeddedDocument::chunk_count).sum();
        let document_count = documents.len();
        state.entries.reserve(added);

        for doc in documents {
            let start = state.entries.len();
            for (chunk_index, (content, vector)) in
                doc.chunks.into_iter().zip(doc.vectors).enumerate()
            {
                let norm = l2_norm(&vector);
                state.entries.push(IndexEntry {
                    content,
                    vector,
                    norm,
                    metadata: EntryMetadata {
                        document_name: doc.name.clone(),
                        chunk_index,
                        processed_at: doc.processed_at,
                    },
                });
            }
            let end = state.entries.len();
            state.order.push(doc.name.clone());
            state.documents.insert(doc.name, start..end);
        }

        tracing::debug!(
            target: "index",
            "appended {added} entries from {document_count} documents ({} total)",
            state.entries.len()
        );

        Ok(added)
    }

    fn validate_batch(&self, documents: &[EmbeddedDocument]) -> IndexResult<()> {
        let mut seen = HashSet::new();

        for doc in documents {
            if !seen.insert(doc.name.as_str()) {
                return Err(IndexError::DuplicateDocument(doc.name.clone()));
            }
            if doc.chunks.is_empty() {
                return Err(IndexError::EmptyDocument(doc.name.clone()));
            }
            if doc.chunks.len() != doc.vectors.len() {
                return Err(IndexError::ChunkCountMismatch {
                    document: doc.name.clone(),
                    chunks: doc.chunks.len(),
                    vectors: doc.vectors.len(),
                });
            }
            if let Some(bad) = doc.vectors.iter().find(|v| v.len() != self.dimension) {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: bad.len(),
                });
            }
        }

        Ok(())
    }

    /// Rank all entries by cosine similarity to `query`.
    ///
    /// Returns at most `top_k` hits, best first, ties in insertion order.
    /// An empty index yields an empty result.
    pub fn similarity_search(&self, query: &[f32], top_k: usize) -> IndexResult<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let state = self.state.read();
        if state.entries.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = rank_entries(query, &state.entries, top_k);
        Ok(ranked
            .into_iter()
            .map(|(position, score)| SearchHit::from_entry(&state.entries[position], score))
            .collect())
    }

    /// Like [`similarity_search`](Self::similarity_search), dropping hits
    /// scoring below `min_similarity`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> IndexResult<Vec<SearchHit>> {
        let hits = self.similarity_search(query, top_k)?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.similarity >= min_similarity)
            .collect())
    }
}
