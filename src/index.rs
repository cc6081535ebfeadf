//! In-memory vector index with on-disk persistence.
//!
//! A [`VectorIndex`] is an ordered list of `(Chunk, vector)` entries that all
//! share one embedding model and dimensionality. It is built wholesale and
//! never mutated after it goes live; the lifecycle manager swaps in a fresh
//! one on rebuild.
//!
//! # Files
//!
//! | File | Format | Contents |
//! |------|--------|----------|
//! | `index.bin` | bincode | model id, dims, entries |
//! | `metadata.json` | JSON | [`IndexMetadata`] |
//!
//! Both are written to a sibling temp file first and renamed into place.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RagError, Result};
use crate::models::Chunk;

/// Build-time facts recorded next to the index, used for staleness checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Seconds since the Unix epoch, taken when the build started.
    pub last_build_time: f64,
    pub document_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub dims: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_strategy: String,
}

impl IndexMetadata {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims,
            entries: Vec::new(),
        }
    }

    /// Append an entry. Vectors of the wrong length are rejected.
    pub fn add(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dims {
            return Err(RagError::Index(format!(
                "dimension mismatch for chunk {}: expected {}, got {}",
                chunk.id,
                self.dims,
                vector.len()
            )));
        }
        self.entries.push(IndexEntry { chunk, vector });
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to `path` with bincode (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        write_atomic(path, &bytes)?;
        debug!(
            "Wrote {} entries ({} bytes) to {}",
            self.entries.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    /// Load from `path`, checking that every vector matches the stored dims.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let index: VectorIndex = bincode::deserialize(&bytes)?;
        if let Some(bad) = index.entries.iter().find(|e| e.vector.len() != index.dims) {
            return Err(RagError::Index(format!(
                "corrupt index {}: chunk {} has {} dims, expected {}",
                path.display(),
                bad.chunk.id,
                bad.vector.len(),
                index.dims
            )));
        }
        Ok(index)
    }
}

/// Write `bytes` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(idx: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("c{}", idx),
            parent_document_id: "doc".to_string(),
            text: text.to_string(),
            sequence_index: idx,
            source_label: "halong.txt".to_string(),
        }
    }

    #[test]
    fn add_rejects_wrong_dims() {
        let mut index = VectorIndex::new("hash-3", 3);
        index.add(chunk(0, "a"), vec![1.0, 0.0, 0.0]).unwrap();
        let err = index.add(chunk(1, "b"), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, RagError::Index(_)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn save_then_load_preserves_entries_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store").join("index.bin");
        let mut index = VectorIndex::new("hash-2", 2);
        index.add(chunk(0, "Hạ Long"), vec![1.0, 0.0]).unwrap();
        index.add(chunk(1, "Cô Tô"), vec![0.0, 1.0]).unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.model(), "hash-2");
        assert_eq!(loaded.dims(), 2);
        assert_eq!(loaded.entries(), index.entries());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn load_garbage_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.bin");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(VectorIndex::load(&path).is_err());
    }

    #[test]
    fn metadata_round_trips_as_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metadata.json");
        let meta = IndexMetadata {
            last_build_time: 1_700_000_000.5,
            document_count: 2,
            chunk_count: 5,
            embedding_model: "hash-384".to_string(),
            dims: 384,
            chunk_size: 1000,
            chunk_overlap: 200,
            chunk_strategy: "paragraph".to_string(),
        };
        meta.write(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["embedding_model"], "hash-384");
        assert_eq!(raw["chunk_count"], 5);
        assert_eq!(IndexMetadata::read(&path).unwrap(), meta);
    }
}
