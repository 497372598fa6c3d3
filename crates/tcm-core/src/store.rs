//! Store traits binding the persisted snapshot to the chat engine
//!
//! The vector, document, and index stores are three explicit, independently
//! testable interfaces tied together only by the id-correspondence
//! invariant: every chunk id in the vector store has exactly one entry in
//! the document store, and vice versa. During serving all stores are
//! read-only and safe for unsynchronized concurrent reads.

use crate::chunk::{ChunkMetadata, ScoredChunk};
use crate::Result;

/// Nearest-neighbor lookup over chunk embeddings
pub trait VectorSearch: Send + Sync {
    /// Return the `k` most similar chunks, highest cosine similarity
    /// first, ties broken by chunk insertion order. `k` greater than the
    /// store size is clamped; an empty store yields an empty vec. Pure
    /// read, never fails.
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk>;

    /// Number of chunks in the store
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lookup of chunk text and source attribution by id
pub trait DocumentLookup: Send + Sync {
    /// Raw chunk text. `Error::NotFound` here means the 1:1 invariant
    /// with the vector store is broken and the caller should treat the
    /// lookup as fatal.
    fn get_text(&self, chunk_id: &str) -> Result<&str>;

    /// Source metadata for the chunk, same failure contract as `get_text`
    fn get_metadata(&self, chunk_id: &str) -> Result<&ChunkMetadata>;
}
