//! Index lifecycle: staleness detection, rebuild, and hot swap.
//!
//! [`IndexManager::ensure_ready`] decides whether the persisted index can be
//! reused or must be rebuilt from the corpus. A rebuild runs off to the side:
//! queries keep reading the previous `Arc<VectorIndex>` until the new one
//! has been written to disk and is swapped in.
//!
//! # State machine
//!
//! ```text
//! Uninitialized ──build──▶ Building ──ok──▶ Ready ──rebuild──▶ Rebuilding ──ok──▶ Ready
//!                              │                                    │
//!                              └────────────err────────▶ Error ◀────┘
//! ```
//!
//! An empty corpus is not an `Error`: the state returns to whatever it was
//! before the attempt and the caller gets [`RagError::CorpusEmpty`].
//!
//! # Staleness
//!
//! The index is rebuilt when any of these hold:
//!
//! | Check | Trigger |
//! |-------|---------|
//! | index file | missing |
//! | metadata file | missing or unreadable |
//! | settings | model, chunk size, overlap or strategy differ from the metadata |
//! | corpus mtime | newer than `last_build_time` |
//! | persisted index | fails to load, or its model/dims disagree with the embedder |
//! | caller | `force = true` |

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{IndexMetadata, VectorIndex};
use crate::loader::load_documents;
use crate::models::Chunk;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Building,
    Ready,
    Rebuilding,
    Error(String),
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Uninitialized => f.write_str("uninitialized"),
            IndexState::Building => f.write_str("building"),
            IndexState::Ready => f.write_str("ready"),
            IndexState::Rebuilding => f.write_str("rebuilding"),
            IndexState::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl Serialize for IndexState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the corpus modification time is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessMode {
    /// mtime of the corpus directory itself. Catches added, removed, and
    /// renamed files but not in-place edits.
    DirectoryMtime,
    /// Newest mtime among the directory and its regular files.
    FileMtime,
}

impl StalenessMode {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "directory_mtime" => Ok(StalenessMode::DirectoryMtime),
            "file_mtime" => Ok(StalenessMode::FileMtime),
            other => Err(RagError::Config(format!("unknown staleness mode '{}'", other))),
        }
    }
}

/// Why a rebuild was started; logged and used in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    Forced,
    MissingIndex,
    MissingMetadata,
    SettingsChanged(String),
    CorpusModified,
    UnusableIndex(String),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Forced => f.write_str("forced"),
            RebuildReason::MissingIndex => f.write_str("index file missing"),
            RebuildReason::MissingMetadata => f.write_str("metadata missing or unreadable"),
            RebuildReason::SettingsChanged(what) => write!(f, "{} changed", what),
            RebuildReason::CorpusModified => f.write_str("corpus modified since last build"),
            RebuildReason::UnusableIndex(why) => write!(f, "persisted index unusable: {}", why),
        }
    }
}

pub struct IndexManager {
    corpus_dir: PathBuf,
    index_path: PathBuf,
    metadata_path: PathBuf,
    staleness: StalenessMode,
    chunk_size: usize,
    chunk_overlap: usize,
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    live: RwLock<Option<Arc<VectorIndex>>>,
    metadata: RwLock<Option<IndexMetadata>>,
    state: RwLock<IndexState>,
    build_lock: tokio::sync::Mutex<()>,
    /// Incremented after every successful build.
    generation: AtomicU64,
}

impl IndexManager {
    pub fn new(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Ok(Self {
            corpus_dir: config.corpus.dir.clone(),
            index_path: config.index.index_path(),
            metadata_path: config.index.metadata_path(),
            staleness: StalenessMode::parse(&config.corpus.staleness)?,
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            chunker: Chunker::from_config(&config.chunking)?,
            embedder,
            batch_size: config.embedding.batch_size.max(1),
            live: RwLock::new(None),
            metadata: RwLock::new(None),
            state: RwLock::new(IndexState::Uninitialized),
            build_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> IndexState {
        self.state.read().clone()
    }

    /// The live index, if one has been loaded or built.
    pub fn current(&self) -> Option<Arc<VectorIndex>> {
        self.live.read().clone()
    }

    /// Metadata of the live index.
    pub fn metadata(&self) -> Option<IndexMetadata> {
        self.metadata.read().clone()
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Make sure a current index is live, building one if needed.
    ///
    /// Calls are serialized. A caller that waited while another build
    /// finished does not force a second build; it only rebuilds if the index
    /// is still stale.
    pub async fn ensure_ready(&self, force: bool) -> Result<()> {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.build_lock.lock().await;
        let coalesced = self.generation.load(Ordering::SeqCst) != observed;
        if coalesced {
            debug!("Another build finished while waiting; re-checking staleness");
        }

        let reason = if force && !coalesced {
            Some(RebuildReason::Forced)
        } else {
            self.stale_reason()
        };

        let reason = match reason {
            Some(reason) => reason,
            None if self.live.read().is_some() => {
                self.set_state(IndexState::Ready);
                return Ok(());
            }
            None => match self.load_persisted().await {
                Ok(()) => return Ok(()),
                Err(e) => RebuildReason::UnusableIndex(e.to_string()),
            },
        };

        info!("Rebuilding index: {}", reason);
        self.rebuild().await
    }

    /// First staleness trigger that applies, cheapest checks first.
    pub fn stale_reason(&self) -> Option<RebuildReason> {
        if !self.index_path.is_file() {
            return Some(RebuildReason::MissingIndex);
        }
        let meta = match IndexMetadata::read(&self.metadata_path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Cannot read {}: {}", self.metadata_path.display(), e);
                return Some(RebuildReason::MissingMetadata);
            }
        };
        if let Some(what) = self.settings_mismatch(&meta) {
            return Some(RebuildReason::SettingsChanged(what));
        }
        match corpus_mtime(&self.corpus_dir, self.staleness) {
            Ok(mtime) if mtime > meta.last_build_time => Some(RebuildReason::CorpusModified),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Cannot read corpus mtime for {}: {}; keeping persisted index",
                    self.corpus_dir.display(),
                    e
                );
                None
            }
        }
    }

    fn settings_mismatch(&self, meta: &IndexMetadata) -> Option<String> {
        if meta.embedding_model != self.embedder.model_name() {
            return Some("embedding model".to_string());
        }
        if meta.dims != self.embedder.dims() {
            return Some("embedding dims".to_string());
        }
        if meta.chunk_size != self.chunk_size {
            return Some("chunk size".to_string());
        }
        if meta.chunk_overlap != self.chunk_overlap {
            return Some("chunk overlap".to_string());
        }
        if meta.chunk_strategy != self.chunker.strategy().as_str() {
            return Some("chunk strategy".to_string());
        }
        None
    }

    async fn load_persisted(&self) -> Result<()> {
        let index_path = self.index_path.clone();
        let metadata_path = self.metadata_path.clone();
        let (index, meta) = blocking("index load", move || {
            let index = VectorIndex::load(&index_path)?;
            let meta = IndexMetadata::read(&metadata_path)?;
            Ok((index, meta))
        })
        .await?;
        if index.model() != self.embedder.model_name() || index.dims() != self.embedder.dims() {
            return Err(RagError::Index(format!(
                "index was built with {} ({} dims), embedder is {} ({} dims)",
                index.model(),
                index.dims(),
                self.embedder.model_name(),
                self.embedder.dims()
            )));
        }
        info!(
            "Loaded index from {} ({} chunks)",
            self.index_path.display(),
            index.len()
        );
        *self.live.write() = Some(Arc::new(index));
        *self.metadata.write() = Some(meta);
        self.set_state(IndexState::Ready);
        Ok(())
    }

    async fn rebuild(&self) -> Result<()> {
        let prior = self.state();
        let had_index = self.live.read().is_some();
        self.set_state(if had_index {
            IndexState::Rebuilding
        } else {
            IndexState::Building
        });

        match self.build().await {
            Ok((index, meta)) => {
                info!(
                    "Index ready: {} documents, {} chunks, model {}",
                    meta.document_count, meta.chunk_count, meta.embedding_model
                );
                *self.live.write() = Some(Arc::new(index));
                *self.metadata.write() = Some(meta);
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.set_state(IndexState::Ready);
                Ok(())
            }
            Err(e) if e.is_corpus_empty() => {
                warn!("{}", e);
                self.set_state(prior);
                Err(e)
            }
            Err(e) => {
                warn!("Index build failed: {}", e);
                self.set_state(IndexState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Load, chunk, embed, and persist a fresh index without touching the
    /// live one.
    async fn build(&self) -> Result<(VectorIndex, IndexMetadata)> {
        let started = now_secs();

        let dir = self.corpus_dir.clone();
        let docs = blocking("document loading", move || load_documents(&dir)).await?;
        if docs.is_empty() {
            return Err(RagError::CorpusEmpty(self.corpus_dir.clone()));
        }

        let chunks: Vec<Chunk> = docs
            .iter()
            .flat_map(|doc| self.chunker.chunk_document(doc))
            .collect();
        if chunks.is_empty() {
            return Err(RagError::CorpusEmpty(self.corpus_dir.clone()));
        }
        debug!("Split {} documents into {} chunks", docs.len(), chunks.len());

        let mut index = VectorIndex::new(self.embedder.model_name(), self.embedder.dims());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                index.add(chunk.clone(), vector)?;
            }
        }

        let meta = IndexMetadata {
            last_build_time: started,
            document_count: docs.len(),
            chunk_count: index.len(),
            embedding_model: self.embedder.model_name().to_string(),
            dims: self.embedder.dims(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            chunk_strategy: self.chunker.strategy().as_str().to_string(),
        };

        // Metadata only after the index landed, so a crash in between
        // leaves a stale-looking pair rather than a fresh-looking one.
        let index_path = self.index_path.clone();
        let metadata_path = self.metadata_path.clone();
        blocking("index save", move || {
            index.save(&index_path)?;
            meta.write(&metadata_path)?;
            Ok((index, meta))
        })
        .await
    }

    fn set_state(&self, state: IndexState) {
        *self.state.write() = state;
    }
}

/// Run file I/O off the async executor.
async fn blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RagError::Index(format!("{} panicked: {}", what, e)))?
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn mtime_secs(meta: &std::fs::Metadata) -> std::io::Result<f64> {
    let modified = meta.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

/// Corpus modification time in seconds since the epoch.
pub fn corpus_mtime(dir: &Path, mode: StalenessMode) -> std::io::Result<f64> {
    let mut newest = mtime_secs(&std::fs::metadata(dir)?)?;
    if mode == StalenessMode::FileMtime {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                newest = newest.max(mtime_secs(&meta)?);
            }
        }
    }
    Ok(newest)
}
