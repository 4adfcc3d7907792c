//! Wiring of the pipeline components from settings.
//!
//! One `Services` value is built at startup and shared by every command or
//! request handler. The live index lives behind its [`IndexHandle`]; nothing
//! here is global.

use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::corpus::{DocumentCorpus, FsCorpus};
use crate::pipeline::{DocumentProcessor, Reindexer};
use crate::retrieval::{OpenAiChatGenerator, RetrievalOrchestrator, TextGenerator};
use crate::vector::{EmbeddingGenerator, IndexHandle, embedder_from_settings};

pub struct Services {
    pub corpus: Arc<dyn DocumentCorpus>,
    pub index: Arc<IndexHandle>,
    pub processor: Arc<DocumentProcessor>,
    pub reindexer: Arc<Reindexer>,
    pub orchestrator: Arc<RetrievalOrchestrator>,
}

impl Services {
    /// Assemble the pipeline around the given collaborators, starting from
    /// an empty index.
    pub fn new(
        settings: &Settings,
        corpus: Arc<dyn DocumentCorpus>,
        embedder: Arc<dyn EmbeddingGenerator>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let index = Arc::new(IndexHandle::empty(embedder.dimension()));
        let processor = Arc::new(DocumentProcessor::new(
            Arc::clone(&embedder),
            settings.chunking.clone(),
            settings.embedding.batch_size,
        ));
        let reindexer = Arc::new(Reindexer::new(Arc::clone(&processor), Arc::clone(&corpus)));
        let orchestrator = Arc::new(RetrievalOrchestrator::new(
            Arc::clone(&index),
            embedder,
            generator,
            settings.retrieval.clone(),
        ));

        Self {
            corpus,
            index,
            processor,
            reindexer,
            orchestrator,
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// Creates blocking HTTP clients, so call it outside any async runtime.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let corpus = open_corpus(settings)?;
        let embedder = embedder_from_settings(&settings.embedding)
            .context("failed to initialize embedding model")?;
        let generator: Arc<dyn TextGenerator> = Arc::new(
            OpenAiChatGenerator::from_settings(&settings.generation)
                .context("failed to initialize text generator")?,
        );

        tracing::info!(
            target: "services",
            "embedding model {} ({} dimensions), generation model {}",
            embedder.model_name(),
            embedder.dimension(),
            generator.model_name()
        );

        Ok(Self::new(settings, corpus, embedder, generator))
    }
}

/// Open the configured filesystem corpus.
pub fn open_corpus(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentCorpus>> {
    let path = settings.resolved_corpus_path();
    let corpus = FsCorpus::open(&path)
        .with_context(|| format!("failed to open corpus at {}", path.display()))?;
    Ok(Arc::new(corpus))
}
