//! Offline corpus ingestion: read documents, chunk, embed, persist
//!
//! This is the one-time `build_index` step. It reads every `.txt` file in
//! the corpus directory (sorted by file name so chunk ids are stable
//! across rebuilds), splits each into sentence-boundary chunks, embeds
//! them through the configured provider, and assembles a validated
//! snapshot.

use std::fs;
use std::path::Path;

use chrono::Utc;
use tcm_core::{ChunkMetadata, EmbeddingProvider, Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::chunker::chunk_text;
use crate::doc_store::{DocEntry, DocumentStore};
use crate::index_store::{DocumentRelation, IndexMeta};
use crate::snapshot::IndexSnapshot;
use crate::vector_store::VectorStore;

/// Corpus ingestion settings
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { chunk_size: 256 }
    }
}

/// Build an index snapshot from every `.txt` document under `corpus_dir`.
pub async fn build_index(
    corpus_dir: impl AsRef<Path>,
    embedder: &dyn EmbeddingProvider,
    config: &BuildConfig,
) -> Result<IndexSnapshot> {
    let corpus_dir = corpus_dir.as_ref();

    let mut paths: Vec<_> = fs::read_dir(corpus_dir)
        .map_err(|e| {
            Error::Configuration(format!("cannot read corpus dir {}: {}", corpus_dir.display(), e))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::Configuration(format!(
            "no .txt documents found in {}",
            corpus_dir.display()
        )));
    }

    let mut vectors = VectorStore::new(embedder.dimension());
    let mut documents = DocumentStore::new();
    let mut relations = Vec::new();

    for path in &paths {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        let text = fs::read_to_string(path)?;
        let chunks = chunk_text(&text, config.chunk_size);

        let mut chunk_ids = Vec::with_capacity(chunks.len());
        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            let id = format!("{}-{:04}", title, ordinal);
            let embedding = embedder.embed(&chunk.text).await?;

            vectors.insert(id.clone(), embedding)?;
            documents.insert(DocEntry {
                id: id.clone(),
                text: chunk.text,
                metadata: ChunkMetadata {
                    title: title.clone(),
                    ordinal,
                    offset: chunk.offset,
                },
            })?;
            chunk_ids.push(id);
        }

        info!(document = %title, chunks = chunk_ids.len(), "indexed document");
        relations.push(DocumentRelation { title, chunk_ids });
    }

    let meta = IndexMeta {
        snapshot_id: Uuid::new_v4().to_string(),
        dimension: embedder.dimension(),
        built_at: Utc::now(),
        documents: relations,
    };

    IndexSnapshot::new(vectors, documents, meta, None)
}

/// Build and persist in one step, replacing any previous snapshot at
/// `persist_dir` atomically.
pub async fn build_and_persist(
    corpus_dir: impl AsRef<Path>,
    persist_dir: impl AsRef<Path>,
    embedder: &dyn EmbeddingProvider,
    config: &BuildConfig,
) -> Result<IndexSnapshot> {
    let snapshot = build_index(corpus_dir, embedder, config).await?;
    snapshot.save(persist_dir)?;
    Ok(snapshot)
}
