//! Search command - rank corpus chunks against a query.

use anyhow::Context;

use super::index::OfflinePipeline;
use crate::cli::tables::search_table;
use crate::config::Settings;
use crate::vector::embed_query;

pub fn run(
    settings: &Settings,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let top_k = settings.retrieval.clamp_top_k(limit);

    let pipeline = OfflinePipeline::from_settings(settings)?;
    let (index, report) = pipeline.build_index()?;
    for failure in &report.failures {
        eprintln!("Skipped {}: {}", failure.document, failure.reason);
    }

    let vector = embed_query(pipeline.embedder.as_ref(), query).context("failed to embed query")?;
    let hits = match threshold {
        Some(min) => index.search_with_threshold(&vector, top_k, min)?,
        None => index.similarity_search(&vector, top_k)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No matching chunks.");
    } else {
        println!("{}", search_table(&hits));
    }
    Ok(())
}
