//! Chunk types: the unit of retrievable corpus text

use serde::{Deserialize, Serialize};

/// Source attribution for a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Title of the source document (file stem for plain-text corpora)
    pub title: String,
    /// Zero-based position of this chunk within its document
    pub ordinal: usize,
    /// Character offset of the chunk start within the source document
    pub offset: usize,
}

/// A unit of retrievable text with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One retrieval hit: a chunk id with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk_id: impl Into<String>, score: f32) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            score,
        }
    }
}
