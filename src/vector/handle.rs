//! Shared reference to the current index generation.
//!
//! Readers clone the current `Arc<VectorIndex>` and keep using it for the
//! whole request. A reindex builds a new index off to the side and publishes
//! it with a single pointer swap, so a reader sees either the old generation
//! or the new one, never a partially built index.
//!
//! Uploads claim their document name here for the whole
//! process-store-append sequence, so two uploads of one name never both
//! reach the corpus.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::index::VectorIndex;

/// Swap point for the live index, plus the single reindex slot and the
/// names of documents being uploaded.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<VectorIndex>>,
    reindexing: AtomicBool,
    uploading: Mutex<HashSet<String>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            reindexing: AtomicBool::new(false),
            uploading: Mutex::new(HashSet::new()),
        }
    }

    /// Handle over an empty index of the given dimensionality.
    pub fn empty(dimension: usize) -> Self {
        Self::new(VectorIndex::new(dimension))
    }

    /// The index generation live at the time of the call.
    pub fn current(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.current.read())
    }

    /// Replace the live index, returning the previous generation.
    pub fn publish(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let (documents, chunks) = (index.document_count(), index.len());
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(index));
        tracing::info!(
            target: "index",
            "published index generation: {documents} documents, {chunks} chunks"
        );
        previous
    }

    /// Claim the reindex slot. `None` while another reindex holds it.
    pub fn try_begin_reindex(self: &Arc<Self>) -> Option<ReindexGuard> {
        self.reindexing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReindexGuard {
                handle: Arc::clone(self),
            })
    }

    pub fn is_reindexing(&self) -> bool {
        self.reindexing.load(Ordering::Acquire)
    }

    /// Claim `name` for an upload. `None` while another upload holds it.
    pub fn try_claim_document(self: &Arc<Self>, name: &str) -> Option<DocumentClaim> {
        self.uploading
            .lock()
            .insert(name.to_string())
            .then(|| DocumentClaim {
                handle: Arc::clone(self),
                name: name.to_string(),
            })
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.uploading.lock().contains(name)
    }
}

/// Holds a document name for one upload; released on drop.
#[derive(Debug)]
pub struct DocumentClaim {
    handle: Arc<IndexHandle>,
    name: String,
}

impl DocumentClaim {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for DocumentClaim {
    fn drop(&mut self) {
        self.handle.uploading.lock().remove(&self.name);
    }
}

/// Holds the reindex slot; released on drop.
#[derive(Debug)]
pub struct ReindexGuard {
    handle: Arc<IndexHandle>,
}

impl ReindexGuard {
    pub fn publish(&self, index: VectorIndex) -> Arc<VectorIndex> {
        self.handle.publish(index)
    }
}

impl Drop for ReindexGuard {
    fn drop(&mut self) {
        self.handle.reindexing.store(false, Ordering::Release);
    }
}
