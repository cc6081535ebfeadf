//! Error taxonomy for the answering engine.
//!
//! Failures that keep the index from ever becoming usable (missing or empty
//! corpus, embedding model unavailable) propagate to the caller. Per-file and
//! per-query failures are absorbed closer to where they happen: ingestion
//! errors are logged and the file skipped, synthesis errors become a
//! localized fallback answer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    /// A single source file could not be read or parsed.
    #[error("failed to ingest {path}: {reason}")]
    Ingestion { path: PathBuf, reason: String },

    /// The corpus directory does not exist or is not a directory.
    #[error("corpus directory not found: {0}")]
    CorpusMissing(PathBuf),

    /// A build found no loadable documents.
    #[error("no loadable documents in {0}")]
    CorpusEmpty(PathBuf),

    /// The embedding model could not be created or loaded.
    #[error("embedding model unavailable: {0}")]
    ModelLoad(String),

    /// An embedding request failed or returned malformed vectors.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector index is inconsistent or could not be persisted/loaded.
    #[error("index error: {0}")]
    Index(String),

    /// The generative model call failed.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl RagError {
    /// True when a build found nothing to index.
    pub fn is_corpus_empty(&self) -> bool {
        matches!(self, RagError::CorpusEmpty(_))
    }
}
