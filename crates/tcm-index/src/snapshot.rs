//! Persisted index snapshot: load, validate, atomic save
//!
//! A snapshot directory holds three JSON artifacts (plus an optional one
//! for image embeddings):
//!
//! ```text
//! doc_emb/
//!   vector_store.json        chunk id -> embedding
//!   docstore.json            chunk id -> text + source metadata
//!   index_store.json         document/chunk relations, dimension, snapshot id
//!   image_vector_store.json  optional image embeddings, same id invariant
//! ```
//!
//! An index is immutable once built. `save` stages the whole directory
//! beside the target and swaps it in with renames, so readers never see a
//! half-written snapshot and a crash mid-write leaves the previous one
//! intact.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tcm_core::{Error, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::doc_store::{DocEntry, DocumentStore};
use crate::index_store::IndexMeta;
use crate::vector_store::{VectorEntry, VectorStore};

pub const VECTOR_STORE_FILE: &str = "vector_store.json";
pub const DOC_STORE_FILE: &str = "docstore.json";
pub const INDEX_STORE_FILE: &str = "index_store.json";
pub const IMAGE_VECTOR_STORE_FILE: &str = "image_vector_store.json";

/// On-disk form of a vector store artifact
#[derive(Debug, Serialize, Deserialize)]
struct VectorStoreFile {
    dimension: usize,
    embeddings: Vec<VectorEntry>,
}

/// On-disk form of the document store artifact
#[derive(Debug, Serialize, Deserialize)]
struct DocStoreFile {
    chunks: Vec<DocEntry>,
}

/// A fully loaded, validated corpus snapshot
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub vectors: VectorStore,
    pub documents: DocumentStore,
    pub meta: IndexMeta,
    /// Present only when the snapshot carries image embeddings
    pub image_vectors: Option<VectorStore>,
}

impl IndexSnapshot {
    pub fn new(
        vectors: VectorStore,
        documents: DocumentStore,
        meta: IndexMeta,
        image_vectors: Option<VectorStore>,
    ) -> Result<Self> {
        let snapshot = Self {
            vectors,
            documents,
            meta,
            image_vectors,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Deserialize a snapshot from `dir`, failing with `CorruptIndex` on
    /// any structural inconsistency. Fatal at startup: a failed load must
    /// abort serving rather than expose a partially valid index.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        recover_interrupted_swap(dir)?;

        let vectors_file: VectorStoreFile = read_artifact(&dir.join(VECTOR_STORE_FILE))?;
        let docs_file: DocStoreFile = read_artifact(&dir.join(DOC_STORE_FILE))?;
        let meta: IndexMeta = read_artifact(&dir.join(INDEX_STORE_FILE))?;

        let vectors = VectorStore::from_entries(vectors_file.dimension, vectors_file.embeddings)?;
        let documents = DocumentStore::from_entries(docs_file.chunks)?;

        let image_path = dir.join(IMAGE_VECTOR_STORE_FILE);
        let image_vectors = if image_path.exists() {
            let file: VectorStoreFile = read_artifact(&image_path)?;
            Some(VectorStore::from_entries(file.dimension, file.embeddings)?)
        } else {
            None
        };

        let snapshot = Self::new(vectors, documents, meta, image_vectors)?;
        info!(
            snapshot_id = %snapshot.meta.snapshot_id,
            chunks = snapshot.vectors.len(),
            dimension = snapshot.vectors.dimension(),
            "loaded index snapshot"
        );
        Ok(snapshot)
    }

    /// Persist the snapshot to `dir`, replacing any previous snapshot
    /// atomically. The artifacts are staged into a fresh sibling
    /// directory first; the previous snapshot stays untouched until the
    /// staged one is complete on disk.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let stage = stage_path(dir)?;
        fs::create_dir_all(&stage)?;

        let result = self.write_artifacts(&stage).and_then(|_| swap_in(&stage, dir));
        if result.is_err() {
            // Leave no stale staging directory behind on failure.
            let _ = fs::remove_dir_all(&stage);
        }
        result?;

        info!(snapshot_id = %self.meta.snapshot_id, path = %dir.display(), "saved index snapshot");
        Ok(())
    }

    fn write_artifacts(&self, stage: &Path) -> Result<()> {
        let vectors_file = VectorStoreFile {
            dimension: self.vectors.dimension(),
            embeddings: self.vectors.entries().to_vec(),
        };
        write_artifact(&stage.join(VECTOR_STORE_FILE), &vectors_file)?;

        let docs_file = DocStoreFile {
            chunks: self.documents.entries().to_vec(),
        };
        write_artifact(&stage.join(DOC_STORE_FILE), &docs_file)?;

        write_artifact(&stage.join(INDEX_STORE_FILE), &self.meta)?;

        if let Some(image_vectors) = &self.image_vectors {
            let file = VectorStoreFile {
                dimension: image_vectors.dimension(),
                embeddings: image_vectors.entries().to_vec(),
            };
            write_artifact(&stage.join(IMAGE_VECTOR_STORE_FILE), &file)?;
        }
        Ok(())
    }

    /// Cross-reference checks for the 1:1 id invariant and the structural
    /// relations in the index store.
    fn validate(&self) -> Result<()> {
        if self.meta.dimension != self.vectors.dimension() {
            return Err(Error::CorruptIndex(format!(
                "index store declares dimension {} but vector store has {}",
                self.meta.dimension,
                self.vectors.dimension()
            )));
        }

        for id in self.vectors.ids() {
            if !self.documents.contains(id) {
                return Err(Error::CorruptIndex(format!(
                    "chunk '{}' has an embedding but no document entry",
                    id
                )));
            }
        }
        for id in self.documents.ids() {
            if !self.vectors.contains(id) {
                return Err(Error::CorruptIndex(format!(
                    "chunk '{}' has a document entry but no embedding",
                    id
                )));
            }
        }

        let mut referenced: HashSet<&str> = HashSet::new();
        for id in self.meta.chunk_ids() {
            if !self.vectors.contains(id) {
                return Err(Error::CorruptIndex(format!(
                    "index store references missing chunk '{}'",
                    id
                )));
            }
            if !referenced.insert(id) {
                return Err(Error::CorruptIndex(format!(
                    "index store references chunk '{}' more than once",
                    id
                )));
            }
        }
        if referenced.len() != self.vectors.len() {
            return Err(Error::CorruptIndex(format!(
                "index store covers {} chunks but vector store holds {}",
                referenced.len(),
                self.vectors.len()
            )));
        }

        if let Some(image_vectors) = &self.image_vectors {
            for id in image_vectors.ids() {
                if !self.documents.contains(id) {
                    return Err(Error::CorruptIndex(format!(
                        "image embedding '{}' has no document entry",
                        id
                    )));
                }
            }
        }

        Ok(())
    }
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        Error::CorruptIndex(format!("missing or unreadable artifact {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::CorruptIndex(format!("malformed artifact {}: {}", path.display(), e)))
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn stage_path(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Configuration(format!("invalid persist path {}", dir.display())))?;
    let parent = dir.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    Ok(parent.join(format!(".{}.stage-{}", name, Uuid::new_v4())))
}

/// The fixed path the previous snapshot is moved aside to during a swap.
/// Deterministic so `load` can find it after an interrupted save.
fn retired_path(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Configuration(format!("invalid persist path {}", dir.display())))?;
    let parent = dir.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    Ok(parent.join(format!(".{}.retired", name)))
}

/// Swap the staged directory into place. Renames within one filesystem;
/// the previous snapshot is moved aside whole before the new one lands,
/// then removed.
fn swap_in(stage: &Path, dir: &Path) -> Result<()> {
    if dir.exists() {
        let retired = retired_path(dir)?;
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        fs::rename(dir, &retired)?;
        fs::rename(stage, dir)?;
        fs::remove_dir_all(&retired)?;
    } else {
        fs::rename(stage, dir)?;
    }
    Ok(())
}

/// A save that died between its two swap renames leaves the previous
/// snapshot whole at the retired path and nothing at `dir`. Move it back
/// so the last complete snapshot stays loadable.
fn recover_interrupted_swap(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    let retired = retired_path(dir)?;
    if retired.exists() {
        fs::rename(&retired, dir)?;
        warn!(path = %dir.display(), "recovered snapshot left aside by an interrupted save");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tcm_core::ChunkMetadata;
    use tcm_core::store::DocumentLookup;

    use crate::index_store::DocumentRelation;

    fn sample_snapshot() -> IndexSnapshot {
        let mut vectors = VectorStore::new(2);
        vectors.insert("syndromes-0000".into(), vec![1.0, 0.0]).unwrap();
        vectors.insert("syndromes-0001".into(), vec![0.0, 1.0]).unwrap();

        let mut documents = DocumentStore::new();
        for (i, (id, text)) in [
            ("syndromes-0000", "气虚的定义是..."),
            ("syndromes-0001", "血瘀指..."),
        ]
        .iter()
        .enumerate()
        {
            documents
                .insert(DocEntry {
                    id: id.to_string(),
                    text: text.to_string(),
                    metadata: ChunkMetadata {
                        title: "syndromes".to_string(),
                        ordinal: i,
                        offset: i * 10,
                    },
                })
                .unwrap();
        }

        let meta = IndexMeta {
            snapshot_id: "snap-1".to_string(),
            dimension: 2,
            built_at: Utc::now(),
            documents: vec![DocumentRelation {
                title: "syndromes".to_string(),
                chunk_ids: vec!["syndromes-0000".to_string(), "syndromes-0001".to_string()],
            }],
        };

        IndexSnapshot::new(vectors, documents, meta, None).unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");

        let snapshot = sample_snapshot();
        snapshot.save(&dir).unwrap();

        let loaded = IndexSnapshot::load(&dir).unwrap();
        assert_eq!(loaded.meta.snapshot_id, "snap-1");
        assert_eq!(loaded.vectors.len(), 2);
        assert_eq!(loaded.documents.get_text("syndromes-0001").unwrap(), "血瘀指...");
        let ids: Vec<&str> = loaded.vectors.ids().collect();
        assert_eq!(ids, vec!["syndromes-0000", "syndromes-0001"]);
    }

    #[test]
    fn save_replaces_previous_snapshot_atomically() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");

        let snapshot = sample_snapshot();
        snapshot.save(&dir).unwrap();

        let mut replacement = sample_snapshot();
        replacement.meta.snapshot_id = "snap-2".to_string();
        replacement.save(&dir).unwrap();

        let loaded = IndexSnapshot::load(&dir).unwrap();
        assert_eq!(loaded.meta.snapshot_id, "snap-2");
        // No staging or retired directories are left behind.
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "doc_emb")
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn crash_before_swap_leaves_previous_snapshot_loadable() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");

        let snapshot = sample_snapshot();
        snapshot.save(&dir).unwrap();

        // Simulate a writer that died after staging but before the swap:
        // artifacts exist in a staging directory, target untouched.
        let stage = stage_path(&dir).unwrap();
        fs::create_dir_all(&stage).unwrap();
        let mut interrupted = sample_snapshot();
        interrupted.meta.snapshot_id = "snap-crashed".to_string();
        interrupted.write_artifacts(&stage).unwrap();

        let loaded = IndexSnapshot::load(&dir).unwrap();
        assert_eq!(loaded.meta.snapshot_id, "snap-1");
    }

    #[test]
    fn crash_between_swap_renames_recovers_previous_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");

        let snapshot = sample_snapshot();
        snapshot.save(&dir).unwrap();

        // Simulate a writer that died after moving the previous snapshot
        // aside but before the staged replacement landed.
        fs::rename(&dir, retired_path(&dir).unwrap()).unwrap();
        assert!(!dir.exists());

        let loaded = IndexSnapshot::load(&dir).unwrap();
        assert_eq!(loaded.meta.snapshot_id, "snap-1");

        // Recovery moved the snapshot back, so a later save swaps cleanly.
        let mut next = sample_snapshot();
        next.meta.snapshot_id = "snap-2".to_string();
        next.save(&dir).unwrap();
        assert_eq!(IndexSnapshot::load(&dir).unwrap().meta.snapshot_id, "snap-2");
        assert!(!retired_path(&dir).unwrap().exists());
    }

    #[test]
    fn image_vectors_survive_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");

        let base = sample_snapshot();
        let mut image_vectors = VectorStore::new(4);
        image_vectors
            .insert("syndromes-0000".into(), vec![0.5, 0.5, 0.5, 0.5])
            .unwrap();
        let snapshot =
            IndexSnapshot::new(base.vectors, base.documents, base.meta, Some(image_vectors))
                .unwrap();
        snapshot.save(&dir).unwrap();
        assert!(dir.join(IMAGE_VECTOR_STORE_FILE).exists());

        let loaded = IndexSnapshot::load(&dir).unwrap();
        let images = loaded.image_vectors.expect("image store should round-trip");
        assert_eq!(images.dimension(), 4);
        assert!(images.contains("syndromes-0000"));
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn load_rejects_embedding_without_document() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");
        sample_snapshot().save(&dir).unwrap();

        // Drop one document entry on disk, keeping its embedding.
        let path = dir.join(DOC_STORE_FILE);
        let mut file: DocStoreFile = read_artifact(&path).unwrap();
        file.chunks.pop();
        write_artifact(&path, &file).unwrap();

        let err = IndexSnapshot::load(&dir).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn load_rejects_relation_to_missing_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");
        sample_snapshot().save(&dir).unwrap();

        let path = dir.join(INDEX_STORE_FILE);
        let mut meta: IndexMeta = read_artifact(&path).unwrap();
        meta.documents[0].chunk_ids.push("ghost-042".to_string());
        write_artifact(&path, &meta).unwrap();

        let err = IndexSnapshot::load(&dir).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn load_rejects_missing_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc_emb");
        sample_snapshot().save(&dir).unwrap();
        fs::remove_file(dir.join(VECTOR_STORE_FILE)).unwrap();

        let err = IndexSnapshot::load(&dir).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }

    #[test]
    fn image_vectors_must_reference_known_documents() {
        let base = sample_snapshot();
        let mut image_vectors = VectorStore::new(4);
        image_vectors.insert("unknown-image".into(), vec![0.0; 4]).unwrap();

        let err =
            IndexSnapshot::new(base.vectors, base.documents, base.meta, Some(image_vectors))
                .unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }
}
