//! Ingestion and full reindexing.

pub mod ingest;
pub mod reindex;

pub use ingest::{DocumentProcessor, IngestError, IngestReport};
pub use reindex::{FailedDocument, ReindexError, ReindexReport, Reindexer};
