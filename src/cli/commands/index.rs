//! Index command - rebuild the index from the corpus and report.

use std::sync::Arc;

use anyhow::Context;

use crate::cli::tables::{failures_table, reindex_table};
use crate::config::Settings;
use crate::pipeline::{DocumentProcessor, ReindexReport, Reindexer};
use crate::services::open_corpus;
use crate::vector::{EmbeddingGenerator, VectorIndex, embedder_from_settings};

/// Embedder and reindexer without a text generator, for commands that never
/// generate.
pub(crate) struct OfflinePipeline {
    pub embedder: Arc<dyn EmbeddingGenerator>,
    pub reindexer: Reindexer,
}

impl OfflinePipeline {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let corpus = open_corpus(settings)?;
        let embedder = embedder_from_settings(&settings.embedding)
            .context("failed to initialize embedding model")?;
        let processor = Arc::new(DocumentProcessor::new(
            Arc::clone(&embedder),
            settings.chunking.clone(),
            settings.embedding.batch_size,
        ));
        Ok(Self {
            embedder,
            reindexer: Reindexer::new(processor, corpus),
        })
    }

    pub fn build_index(&self) -> anyhow::Result<(VectorIndex, ReindexReport)> {
        self.reindexer
            .rebuild()
            .context("failed to read the document corpus")
    }
}

pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let pipeline = OfflinePipeline::from_settings(settings)?;
    let (_, report) = pipeline.build_index()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Corpus: {}", settings.resolved_corpus_path().display());
        println!("{}", reindex_table(&report));
        if !report.failures.is_empty() {
            println!("{}", failures_table(&report));
        }
    }

    if report.documents_attempted > 0 && report.documents_indexed == 0 {
        anyhow::bail!("no documents could be indexed");
    }
    Ok(())
}
