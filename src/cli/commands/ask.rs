//! Ask and Risk commands - answers that need the text generator.

use anyhow::Context;
use serde::Serialize;

use crate::config::Settings;
use crate::retrieval::{RiskSummary, Source};
use crate::services::Services;

/// Build all services and index the corpus once.
fn indexed_services(settings: &Settings) -> anyhow::Result<Services> {
    let services = Services::from_settings(settings)?;
    let report = services
        .reindexer
        .run(&services.index)
        .context("failed to index the corpus")?;
    for failure in &report.failures {
        eprintln!("Skipped {}: {}", failure.document, failure.reason);
    }
    Ok(services)
}

#[derive(Serialize)]
struct AskOutput<'a> {
    query: &'a str,
    response: &'a str,
    context_used: bool,
    sources: &'a [Source],
}

pub fn run(settings: &Settings, query: &str, top_k: Option<usize>, json: bool) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let top_k = settings.retrieval.clamp_top_k(top_k);
    let services = indexed_services(settings)?;
    let answer = services.orchestrator.answer(query, top_k)?;

    if json {
        let output = AskOutput {
            query,
            response: answer.response(),
            context_used: answer.context_used(),
            sources: answer.sources(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", answer.response());
    if !answer.sources().is_empty() {
        println!();
        println!("Sources:");
        for source in answer.sources() {
            println!(
                "  {} #{} ({:.3})",
                source.document_name, source.chunk_index, source.similarity
            );
        }
    }
    Ok(())
}

pub fn run_risk(settings: &Settings, document: &str, json: bool) -> anyhow::Result<()> {
    let services = indexed_services(settings)?;
    let assessment = services.orchestrator.assess_risk(document)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let summary = RiskSummary::from(&assessment);
    println!("{}: {} risk", assessment.document_name, summary.overall_risk_level);
    println!(
        "Clauses: {} high, {} medium, {} low",
        summary.high_risk_clauses, summary.medium_risk_clauses, summary.low_risk_clauses
    );
    if !assessment.summary.is_empty() {
        println!();
        println!("{}", assessment.summary);
    }
    for clause in &summary.clause_summaries {
        println!();
        println!(
            "[{}] {} ({:.2}): {}",
            clause.clause_number, clause.risk_level, clause.confidence_score, clause.clause_preview
        );
        println!("    {}", clause.brief_explanation);
    }
    if summary.has_more_clauses {
        println!();
        println!("Use --json for all {} clauses.", summary.total_clauses_assessed);
    }
    if !assessment.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for recommendation in &assessment.recommendations {
            println!("  - {recommendation}");
        }
    }
    Ok(())
}
