//! Chunk-id -> text and source metadata store

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tcm_core::{ChunkMetadata, DocumentLookup, Error, Result};

/// One persisted chunk body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Document store half of the snapshot. Kept in 1:1 id correspondence with
/// the vector store; a miss here is a corruption signal, not a normal
/// lookup failure.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    entries: Vec<DocEntry>,
    by_id: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<DocEntry>) -> Result<Self> {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, entry: DocEntry) -> Result<()> {
        if self.by_id.contains_key(&entry.id) {
            return Err(Error::CorruptIndex(format!("duplicate chunk id '{}'", entry.id)));
        }
        self.by_id.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn entries(&self) -> &[DocEntry] {
        &self.entries
    }

    fn get(&self, chunk_id: &str) -> Result<&DocEntry> {
        self.by_id
            .get(chunk_id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::NotFound(chunk_id.to_string()))
    }
}

impl DocumentLookup for DocumentStore {
    fn get_text(&self, chunk_id: &str) -> Result<&str> {
        Ok(self.get(chunk_id)?.text.as_str())
    }

    fn get_metadata(&self, chunk_id: &str) -> Result<&ChunkMetadata> {
        Ok(&self.get(chunk_id)?.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, text: &str) -> DocEntry {
        DocEntry {
            id: id.to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                title: "《中医基础理论》".to_string(),
                ordinal: 0,
                offset: 0,
            },
        }
    }

    #[test]
    fn lookup_returns_text_and_metadata() {
        let store = DocumentStore::from_entries(vec![entry("c1", "气虚的定义是...")]).unwrap();
        assert_eq!(store.get_text("c1").unwrap(), "气虚的定义是...");
        assert_eq!(store.get_metadata("c1").unwrap().title, "《中医基础理论》");
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = DocumentStore::from_entries(vec![entry("c1", "气虚的定义是...")]).unwrap();
        let err = store.get_text("c2").unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id == "c2"));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = DocumentStore::new();
        store.insert(entry("c1", "a")).unwrap();
        let err = store.insert(entry("c1", "b")).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }
}
