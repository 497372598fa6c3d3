//! Structural metadata binding chunks into logical documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered chunk ids belonging to one source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRelation {
    /// Source document title (file stem for plain-text corpora)
    pub title: String,
    /// Chunk ids in document order
    pub chunk_ids: Vec<String>,
}

/// Index-store half of the snapshot: which documents exist, how their
/// chunks are ordered, and which embedding dimension backs the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Unique id of this corpus snapshot, regenerated on every rebuild
    pub snapshot_id: String,
    /// Embedding dimension of the backing vector store
    pub dimension: usize,
    /// When the snapshot was built
    pub built_at: DateTime<Utc>,
    /// Document -> chunk ordering relations
    pub documents: Vec<DocumentRelation>,
}

impl IndexMeta {
    /// All chunk ids referenced by the relations, in document order
    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .flat_map(|d| d.chunk_ids.iter().map(|id| id.as_str()))
    }

    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunk_ids.len()).sum()
    }
}
