//! Embedding, storage and ranked search of document chunks.

pub mod embedding;
pub mod error;
pub mod handle;
pub mod index;
pub mod similarity;

pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, OpenAiEmbedder, embed_all, embed_query,
    embedder_from_settings,
};
pub use error::{EmbeddingError, IndexError, IndexResult};
pub use handle::{DocumentClaim, IndexHandle, ReindexGuard};
pub use index::{EmbeddedDocument, EntryMetadata, IndexEntry, SearchHit, VectorIndex};
pub use similarity::{cosine_similarity, select_top_k};
