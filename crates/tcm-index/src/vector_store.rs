//! Insertion-ordered embedding store with cosine top-k search

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tcm_core::{Error, Result, ScoredChunk, VectorSearch};

/// One persisted embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
}

/// Chunk-id -> embedding store.
///
/// Entries keep their insertion order, which doubles as the tie-break order
/// for equal similarity scores. The store is append-only while an index is
/// being built and read-only afterwards.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimension: usize,
    entries: Vec<VectorEntry>,
    by_id: HashMap<String, usize>,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Rebuild a store from persisted entries, re-checking dimensions and
    /// id uniqueness. Used by snapshot loading.
    pub fn from_entries(dimension: usize, entries: Vec<VectorEntry>) -> Result<Self> {
        let mut store = Self::new(dimension);
        for entry in entries {
            store.insert(entry.id, entry.vector)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, id: String, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::CorruptIndex(format!(
                "embedding for chunk '{}' has dimension {}, expected {}",
                id,
                vector.len(),
                self.dimension
            )));
        }
        if self.by_id.contains_key(&id) {
            return Err(Error::CorruptIndex(format!("duplicate chunk id '{}'", id)));
        }
        self.by_id.insert(id.clone(), self.entries.len());
        self.entries.push(VectorEntry { id, vector });
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl VectorSearch for VectorStore {
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|e| ScoredChunk::new(e.id.clone(), Self::cosine_similarity(query_embedding, &e.vector)))
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.entries.len()));
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
