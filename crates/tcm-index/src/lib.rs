//! Persisted index and retrieval for the TCM question answering assistant
//!
//! This crate owns the three persisted stores (vector, document, index),
//! the snapshot that binds them under the 1:1 id-correspondence invariant,
//! the cosine top-k retriever, and the offline corpus builder.

mod builder;
mod chunker;
mod doc_store;
mod index_store;
mod retriever;
mod snapshot;
mod vector_store;

pub use builder::{build_and_persist, build_index, BuildConfig};
pub use chunker::{chunk_text, TextChunk};
pub use doc_store::{DocEntry, DocumentStore};
pub use index_store::{DocumentRelation, IndexMeta};
pub use retriever::{Retriever, RetrieverConfig};
pub use snapshot::{
    IndexSnapshot, DOC_STORE_FILE, IMAGE_VECTOR_STORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE,
};
pub use vector_store::{VectorEntry, VectorStore};

// Re-export core types for convenience
pub use tcm_core::{Chunk, ChunkMetadata, DocumentLookup, Error, Result, ScoredChunk, VectorSearch};
