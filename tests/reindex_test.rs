mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedGenerator, UNEMBEDDABLE, marker_services, services, write_doc};
use docrag::pipeline::ReindexError;
use tempfile::TempDir;

const LEASE: &str = "The tenant shall pay rent on the first day of each month. \
Late rent incurs a fee of five percent. The landlord maintains the roof.";

const HANDBOOK: &str = "# Handbook\n\nEmployees accrue vacation monthly. \
Unused vacation carries over once.";

#[test]
fn test_reindex_skips_unsupported_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "lease.txt", LEASE.as_bytes());
    write_doc(dir.path(), "policies/handbook.md", HANDBOOK.as_bytes());
    write_doc(dir.path(), "broken.pdf", b"not really a pdf");
    write_doc(dir.path(), "legacy.doc", b"binary word document");

    let services = services(dir.path(), Arc::new(ScriptedGenerator::new("ok")));
    let report = services.reindexer.run(&services.index).unwrap();

    assert_eq!(report.documents_attempted, 3);
    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document, "broken.pdf");
    assert!(report.published);

    let index = services.index.current();
    assert_eq!(
        index.document_names(),
        vec!["lease.txt".to_string(), "policies/handbook.md".to_string()]
    );
    let chunks: usize = index
        .document_names()
        .iter()
        .map(|name| index.document_chunks(name).unwrap().len())
        .sum();
    assert_eq!(report.total_chunks, chunks);
    assert_eq!(index.len(), chunks);
}

#[test]
fn test_embedding_failure_is_isolated_to_its_document() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "a-lease.txt", LEASE.as_bytes());
    write_doc(
        dir.path(),
        "b-rejected.txt",
        format!("This clause is {UNEMBEDDABLE} by the model.").as_bytes(),
    );
    write_doc(dir.path(), "c-handbook.md", HANDBOOK.as_bytes());

    let services = marker_services(dir.path(), Duration::ZERO);
    let report = services.reindexer.run(&services.index).unwrap();

    assert_eq!(report.documents_attempted, 3);
    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document, "b-rejected.txt");
    assert!(report.failures[0].reason.contains("model rejected input"));
    assert!(report.published);

    let index = services.index.current();
    assert_eq!(
        index.document_names(),
        vec!["a-lease.txt".to_string(), "c-handbook.md".to_string()]
    );
    assert!(!index.contains_document("b-rejected.txt"));
    let successful_chunks: usize = ["a-lease.txt", "c-handbook.md"]
        .iter()
        .map(|name| index.document_chunks(name).unwrap().len())
        .sum();
    assert_eq!(index.len(), successful_chunks);
    assert_eq!(report.total_chunks, successful_chunks);
}

#[test]
fn test_reindex_with_no_successes_keeps_current_index() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "lease.txt", LEASE.as_bytes());

    let services = services(dir.path(), Arc::new(ScriptedGenerator::new("ok")));
    services.reindexer.run(&services.index).unwrap();
    let before = services.index.current();
    assert_eq!(before.document_count(), 1);

    std::fs::remove_file(dir.path().join("lease.txt")).unwrap();
    write_doc(dir.path(), "broken.pdf", b"%PDF-garbage");

    let report = services.reindexer.run(&services.index).unwrap();
    assert_eq!(report.documents_indexed, 0);
    assert!(!report.published);
    assert!(Arc::ptr_eq(&before, &services.index.current()));
}

#[test]
fn test_reindex_of_empty_corpus() {
    let dir = TempDir::new().unwrap();
    let services = services(dir.path(), Arc::new(ScriptedGenerator::new("ok")));

    let report = services.reindexer.run(&services.index).unwrap();
    assert_eq!(report.documents_attempted, 0);
    assert!(!report.published);
    assert!(services.index.current().is_empty());
}

#[test]
fn test_reindex_rejected_while_another_runs() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "lease.txt", LEASE.as_bytes());
    let services = services(dir.path(), Arc::new(ScriptedGenerator::new("ok")));

    let guard = services.index.try_begin_reindex().unwrap();
    assert!(matches!(
        services.reindexer.run(&services.index),
        Err(ReindexError::InProgress)
    ));
    drop(guard);

    assert!(services.reindexer.run(&services.index).is_ok());
}

#[test]
fn test_answer_after_reindex_cites_sources() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "lease.txt", LEASE.as_bytes());
    write_doc(dir.path(), "handbook.md", HANDBOOK.as_bytes());

    let generator = Arc::new(ScriptedGenerator::new("Rent is due on the first."));
    let services = services(dir.path(), Arc::clone(&generator));
    services.reindexer.run(&services.index).unwrap();

    let answer = services.orchestrator.answer("when is rent due", 1).unwrap();
    assert!(answer.context_used());
    assert_eq!(answer.response(), "Rent is due on the first.");
    assert_eq!(answer.sources().len(), 1);
    assert_eq!(answer.sources()[0].document_name, "lease.txt");
    assert_eq!(generator.calls(), 1);
}

#[test]
fn test_answer_on_empty_index_skips_generator() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new("unused"));
    let services = services(dir.path(), Arc::clone(&generator));

    let answer = services.orchestrator.answer("anything", 3).unwrap();
    assert!(!answer.context_used());
    assert!(answer.sources().is_empty());
    assert_eq!(generator.calls(), 0);
}
