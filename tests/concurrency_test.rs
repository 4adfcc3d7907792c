mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use common::{
    DIMENSION, HashEmbedder, SLOW, ScriptedGenerator, marker_services, services, write_doc,
};
use docrag::Document;
use docrag::pipeline::IngestError;
use docrag::vector::{EmbeddedDocument, IndexError, EmbeddingGenerator, IndexHandle, VectorIndex, embed_query};
use tempfile::TempDir;

fn embedded(name: &str, text: &str) -> EmbeddedDocument {
    let vectors = HashEmbedder.embed_batch(&[text]).unwrap();
    EmbeddedDocument::new(name, vec![text.to_string()], vectors)
}

#[test]
fn test_searches_run_while_documents_are_added() {
    let handle = Arc::new(IndexHandle::empty(DIMENSION));
    let done = Arc::new(AtomicBool::new(false));
    let query = embed_query(&HashEmbedder, "clause number").unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let done = Arc::clone(&done);
            let query = query.clone();
            thread::spawn(move || {
                let mut searches = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let hits = handle.current().similarity_search(&query, 5).unwrap();
                    assert!(hits.len() <= 5);
                    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
                    searches += 1;
                }
                searches
            })
        })
        .collect();

    let writer = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            for i in 0..200 {
                let doc = embedded(&format!("doc-{i}.txt"), &format!("clause number {i}"));
                handle.current().add(vec![doc]).unwrap();
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }

    let index = handle.current();
    assert_eq!(index.document_count(), 200);
    assert_eq!(index.len(), 200);
}

#[test]
fn test_concurrent_duplicate_adds_admit_one() {
    let index = Arc::new(VectorIndex::new(DIMENSION));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || index.add(vec![embedded("same.txt", "identical text")]))
        })
        .collect();
    let results: Vec<_> = workers.into_iter().map(|t| t.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_reader_keeps_its_generation_across_reindex() {
    let dir = TempDir::new().unwrap();
    write_doc(dir.path(), "first.txt", b"Payment is due within thirty days.");
    let services = services(dir.path(), Arc::new(ScriptedGenerator::new("ok")));
    services.reindexer.run(&services.index).unwrap();

    let held = services.index.current();
    assert_eq!(held.document_names(), vec!["first.txt".to_string()]);

    write_doc(dir.path(), "second.txt", b"Either party may terminate with notice.");
    services.reindexer.run(&services.index).unwrap();

    // The old generation is untouched; new readers see the rebuilt index.
    assert_eq!(held.document_names(), vec!["first.txt".to_string()]);
    assert_eq!(services.index.current().document_count(), 2);
    assert!(!services.index.is_reindexing());
}

#[test]
fn test_parallel_reindex_requests_admit_one() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        write_doc(
            dir.path(),
            &format!("doc-{i:02}.txt"),
            format!("Section {i} covers indemnity and liability caps.").as_bytes(),
        );
    }
    let services = Arc::new(services(dir.path(), Arc::new(ScriptedGenerator::new("ok"))));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let services = Arc::clone(&services);
            thread::spawn(move || services.reindexer.run(&services.index))
        })
        .collect();
    let results: Vec<_> = workers.into_iter().map(|t| t.join().unwrap()).collect();

    // Requests may also run back to back, so at least one succeeds and every
    // rejection is InProgress.
    assert!(results.iter().any(|r| r.is_ok()));
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, docrag::pipeline::ReindexError::InProgress));
        }
    }
    assert_eq!(services.index.current().document_count(), 20);
}

#[test]
fn test_same_name_ingest_keeps_first_upload_on_disk() {
    let dir = TempDir::new().unwrap();
    let services = marker_services(dir.path(), Duration::from_millis(300));
    let first = format!("{SLOW} first version of the clause.").into_bytes();
    let second = b"Second version of the clause.".to_vec();

    let slow_upload = {
        let processor = Arc::clone(&services.processor);
        let corpus = Arc::clone(&services.corpus);
        let handle = Arc::clone(&services.index);
        let document = Document::new("clause.txt", first.clone());
        thread::spawn(move || processor.ingest(&handle, corpus.as_ref(), &document))
    };
    // Let the slow upload claim the name and start embedding
    thread::sleep(Duration::from_millis(50));
    let rival = services.processor.ingest(
        &services.index,
        services.corpus.as_ref(),
        &Document::new("clause.txt", second),
    );

    assert!(matches!(
        rival,
        Err(IngestError::Index(IndexError::DuplicateDocument(ref name))) if name == "clause.txt"
    ));
    let report = slow_upload.join().unwrap().unwrap();
    assert_eq!(report.chunks_indexed, 1);
    assert_eq!(std::fs::read(dir.path().join("clause.txt")).unwrap(), first);
    assert_eq!(services.index.current().document_names(), vec!["clause.txt"]);
    assert!(!services.index.is_claimed("clause.txt"));
}
