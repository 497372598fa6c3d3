//! Top-k similarity retrieval over a vector store

use tcm_core::{Error, Result, ScoredChunk, VectorSearch};
use tracing::debug;

/// Retrieval settings
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// How many chunks to retrieve per query
    pub top_k: usize,
    /// Optional similarity floor. When set, hits below it are discarded
    /// and a query with no surviving hit yields `Error::EmptyResult`.
    pub min_score: Option<f32>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
        }
    }
}

/// Read-only retrieval front over a vector store. Holds only settings;
/// the store is shared by the caller and passed per query.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }

    pub fn top_k(&self) -> usize {
        self.config.top_k
    }

    /// Rank `store` against `query_embedding`.
    ///
    /// Returns at most `top_k` hits in descending score order. Without a
    /// floor an empty store yields an empty vec. With `min_score`
    /// configured, a query with no hit at or above the floor is reported
    /// as `EmptyResult` so the chat engine can fall back instead of
    /// prompting with noise; an empty store can never clear the floor, so
    /// it is reported the same way.
    pub fn retrieve<V: VectorSearch>(
        &self,
        store: &V,
        query_embedding: &[f32],
    ) -> Result<Vec<ScoredChunk>> {
        let mut hits = store.search(query_embedding, self.config.top_k);

        if let Some(floor) = self.config.min_score {
            hits.retain(|h| h.score >= floor);
            if hits.is_empty() {
                return Err(Error::EmptyResult);
            }
        }

        debug!(hits = hits.len(), top_k = self.config.top_k, "retrieval complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::VectorStore;

    fn store() -> VectorStore {
        let mut s = VectorStore::new(2);
        s.insert("a".into(), vec![1.0, 0.0]).unwrap();
        s.insert("b".into(), vec![0.0, 1.0]).unwrap();
        s
    }

    #[test]
    fn retrieves_top_k() {
        let retriever = Retriever::new(RetrieverConfig { top_k: 1, min_score: None });
        let hits = retriever.retrieve(&store(), &[1.0, 0.1]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn empty_store_yields_empty_hits() {
        let retriever = Retriever::default();
        assert!(retriever.retrieve(&VectorStore::new(2), &[1.0, 0.0]).unwrap().is_empty());
    }

    #[test]
    fn min_score_floor_reports_empty_result() {
        let retriever = Retriever::new(RetrieverConfig { top_k: 5, min_score: Some(0.99) });
        // Query scores well below the floor on every chunk.
        let err = retriever.retrieve(&store(), &[0.6, 0.8]).unwrap_err();
        assert!(matches!(err, Error::EmptyResult));
    }

    #[test]
    fn min_score_on_empty_store_reports_empty_result() {
        let retriever = Retriever::new(RetrieverConfig { top_k: 5, min_score: Some(0.5) });
        let err = retriever.retrieve(&VectorStore::new(2), &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::EmptyResult));
    }

    #[test]
    fn min_score_keeps_clearing_hits() {
        let retriever = Retriever::new(RetrieverConfig { top_k: 5, min_score: Some(0.9) });
        let hits = retriever.retrieve(&store(), &[1.0, 0.05]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }
}
