//! Terminal tables for command output.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::pipeline::ReindexReport;
use crate::vector::SearchHit;

/// Longest chunk preview shown in a search table cell.
const PREVIEW_CHARS: usize = 160;

fn base_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

/// Single-line preview of chunk text.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

pub fn search_table(hits: &[SearchHit]) -> Table {
    let mut table = base_table(vec!["#", "Score", "Document", "Chunk", "Text"]);
    for (rank, hit) in hits.iter().enumerate() {
        table.add_row(vec![
            right(rank + 1),
            right(format!("{:.3}", hit.similarity)),
            Cell::new(&hit.document_name),
            right(hit.chunk_index),
            Cell::new(preview(&hit.content, PREVIEW_CHARS)),
        ]);
    }
    table
}

pub fn reindex_table(report: &ReindexReport) -> Table {
    let mut table = base_table(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Documents attempted"), right(report.documents_attempted)]);
    table.add_row(vec![Cell::new("Documents indexed"), right(report.documents_indexed)]);
    table.add_row(vec![
        Cell::new("Unsupported files skipped"),
        right(report.documents_skipped),
    ]);
    table.add_row(vec![Cell::new("Failures"), right(report.failures.len())]);
    table.add_row(vec![Cell::new("Chunks"), right(report.total_chunks)]);
    table
}

pub fn failures_table(report: &ReindexReport) -> Table {
    let mut table = base_table(vec!["Document", "Reason"]);
    for failure in &report.failures {
        table.add_row(vec![Cell::new(&failure.document), Cell::new(&failure.reason)]);
    }
    table
}
