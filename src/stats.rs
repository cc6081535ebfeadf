//! Index statistics.
//!
//! [`IndexStats`] is a snapshot of what is indexed and how it was built,
//! used by `qbot stats` to show whether the index matches the corpus.

use serde::Serialize;
use std::path::PathBuf;

use crate::index::IndexMetadata;
use crate::lifecycle::IndexState;

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub state: IndexState,
    pub corpus_dir: PathBuf,
    pub index_path: PathBuf,
    pub index_bytes: u64,
    pub embedding_model: String,
    pub llm_model: String,
    pub document_count: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Seconds since the Unix epoch; `None` before the first build.
    pub last_build_time: Option<f64>,
}

impl IndexStats {
    /// Fill counts from `meta` when an index has been built or loaded.
    pub fn with_metadata(mut self, meta: Option<&IndexMetadata>) -> Self {
        if let Some(meta) = meta {
            self.document_count = meta.document_count;
            self.chunk_count = meta.chunk_count;
            self.chunk_size = meta.chunk_size;
            self.chunk_overlap = meta.chunk_overlap;
            self.last_build_time = Some(meta.last_build_time);
        }
        self
    }

    /// Render the human-readable report printed by `qbot stats`.
    pub fn render(&self) -> String {
        let built = match self.last_build_time {
            Some(ts) => format_ts_relative(ts as i64),
            None => "never".to_string(),
        };
        let lines = [
            "QBot — Index Stats".to_string(),
            "==================".to_string(),
            String::new(),
            format!("  State:       {}", self.state),
            format!("  Corpus:      {}", self.corpus_dir.display()),
            format!("  Index:       {}", self.index_path.display()),
            format!("  Size:        {}", format_bytes(self.index_bytes)),
            String::new(),
            format!("  Documents:   {}", self.document_count),
            format!("  Chunks:      {}", self.chunk_count),
            format!(
                "  Chunking:    {} chars, {} overlap",
                self.chunk_size, self.chunk_overlap
            ),
            format!("  Embeddings:  {}", self.embedding_model),
            format!("  LLM:         {}", self.llm_model),
            format!("  Last build:  {}", built),
        ];
        lines.join("\n")
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now ("3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts_iso(ts);
    }
    let plural = |n: i64| if n == 1 { "" } else { "s" };
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        format!("{} min{} ago", delta / 60, plural(delta / 60))
    } else if delta < 86400 {
        format!("{} hour{} ago", delta / 3600, plural(delta / 3600))
    } else if delta < 86400 * 30 {
        format!("{} day{} ago", delta / 86400, plural(delta / 86400))
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
