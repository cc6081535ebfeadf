//! Corpus directory loader.
//!
//! Enumerates the regular files directly inside the corpus directory (no
//! recursion), selects a [`FileKind`] by extension, and normalizes each file
//! through [`extract`](crate::extract). Unsupported extensions and per-file
//! failures are logged and skipped; only a missing directory is an error.

use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{RagError, Result};
use crate::extract::extract_text;
use crate::models::{FileKind, SourceDocument};

/// Load every supported document in `dir`, sorted by file name.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Err(RagError::CorpusMissing(dir.to_path_buf()));
    }

    let mut docs = Vec::new();
    let mut failed = 0usize;

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = FileKind::from_path(path) else {
            warn!("Unsupported format, skipping: {}", path.display());
            continue;
        };

        match load_file(path, kind) {
            Ok(Some(doc)) => {
                debug!("Loaded {} ({} chars)", path.display(), doc.raw_text.chars().count());
                docs.push(doc);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        warn!("Failed to load {} file(s) from {}", failed, dir.display());
    }
    info!("Loaded {} document(s) from {}", docs.len(), dir.display());
    Ok(docs)
}

/// Read and normalize one file.
///
/// `Ok(None)` means the file was skipped: its parser is not compiled in, or
/// it contained no text.
pub fn load_file(path: &Path, kind: FileKind) -> Result<Option<SourceDocument>> {
    let ingestion_err = |reason: String| RagError::Ingestion {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| ingestion_err(e.to_string()))?;
    let mtime = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let bytes = std::fs::read(path).map_err(|e| ingestion_err(e.to_string()))?;
    let text = match extract_text(&bytes, kind).map_err(|e| ingestion_err(e.to_string()))? {
        Some(text) => text,
        None => {
            warn!(
                "No {} parser compiled in, skipping: {}",
                kind.as_str(),
                path.display()
            );
            return Ok(None);
        }
    };

    if text.trim().is_empty() {
        debug!("No text in {}, skipping", path.display());
        return Ok(None);
    }

    Ok(Some(SourceDocument {
        id: document_id(path),
        source_path: path.to_path_buf(),
        file_kind: kind,
        raw_text: text,
        mtime,
    }))
}

/// Stable document id: SHA-256 of the source path.
fn document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_documents(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, RagError::CorpusMissing(_)));
    }

    #[test]
    fn unsupported_files_only_yield_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.png"), [0u8, 1, 2]).unwrap();
        fs::write(tmp.path().join("notes.xyz"), "hello").unwrap();
        fs::write(tmp.path().join("Makefile"), "all:").unwrap();
        let docs = load_documents(tmp.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn corrupt_file_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{not json").unwrap();
        fs::write(tmp.path().join("good.txt"), "Bãi Cháy beach").unwrap();
        let docs = load_documents(tmp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_label(), "good.txt");
    }

    #[test]
    fn does_not_recurse_and_sorts_by_name() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("deep.txt"), "hidden").unwrap();
        fs::write(tmp.path().join("b.txt"), "second").unwrap();
        fs::write(tmp.path().join("a.txt"), "first").unwrap();
        let docs = load_documents(tmp.path()).unwrap();
        let labels: Vec<String> = docs.iter().map(|d| d.source_label()).collect();
        assert_eq!(labels, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn blank_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("empty.txt"), "  \n\n ").unwrap();
        assert!(load_documents(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn document_ids_are_stable() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "x").unwrap();
        let first = load_documents(tmp.path()).unwrap();
        let second = load_documents(tmp.path()).unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].file_kind, FileKind::PlainText);
    }
}
