//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docrag::config::Settings;
use docrag::corpus::{DocumentCorpus, FsCorpus};
use docrag::retrieval::{GenerationError, TextGenerator};
use docrag::services::Services;
use docrag::vector::{EmbeddingError, EmbeddingGenerator};

pub const DIMENSION: usize = 64;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
pub struct HashEmbedder;

pub fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
        % DIMENSION
}

impl EmbeddingGenerator for HashEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0; DIMENSION];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[bucket(&word.to_lowercase())] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }
}

/// Word that makes [`MarkerEmbedder`] fail the batch.
pub const UNEMBEDDABLE: &str = "UNEMBEDDABLE";
/// Word that makes [`MarkerEmbedder`] stall before answering.
pub const SLOW: &str = "SLOW";

/// [`HashEmbedder`] that fails batches containing [`UNEMBEDDABLE`] and
/// sleeps on batches containing [`SLOW`].
pub struct MarkerEmbedder {
    pub delay: Duration,
}

impl EmbeddingGenerator for MarkerEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.contains(UNEMBEDDABLE)) {
            return Err(EmbeddingError::BatchFailed("model rejected input".into()));
        }
        if texts.iter().any(|t| t.contains(SLOW)) {
            std::thread::sleep(self.delay);
        }
        HashEmbedder.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "marker"
    }
}

/// Returns a fixed reply and counts calls.
pub struct ScriptedGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn write_doc(root: &Path, name: &str, contents: &[u8]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Services over a filesystem corpus at `root` with test collaborators.
pub fn services(root: &Path, generator: Arc<ScriptedGenerator>) -> Services {
    services_with_embedder(root, Arc::new(HashEmbedder), generator)
}

pub fn services_with_embedder(
    root: &Path,
    embedder: Arc<dyn EmbeddingGenerator>,
    generator: Arc<ScriptedGenerator>,
) -> Services {
    let mut settings = Settings::default();
    settings.corpus_path = root.to_path_buf();
    let corpus: Arc<dyn DocumentCorpus> = Arc::new(FsCorpus::new(root));
    Services::new(&settings, corpus, embedder, generator)
}

pub fn marker_services(root: &Path, delay: Duration) -> Services {
    services_with_embedder(
        root,
        Arc::new(MarkerEmbedder { delay }),
        Arc::new(ScriptedGenerator::new("ok")),
    )
}
