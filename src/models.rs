//! Core data models.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the build path (load → chunk → embed → index) and the query
//! path (embed → retrieve → synthesize).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source formats the loader knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    PlainText,
    Csv,
    Json,
    Pdf,
    Docx,
}

impl FileKind {
    /// Select a kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(FileKind::PlainText),
            "csv" => Some(FileKind::Csv),
            "json" => Some(FileKind::Json),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::PlainText => "text",
            FileKind::Csv => "csv",
            FileKind::Json => "json",
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
        }
    }
}

/// A file from the corpus, normalized to plain text.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub source_path: PathBuf,
    pub file_kind: FileKind,
    pub raw_text: String,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: i64,
}

impl SourceDocument {
    /// File name used to tag every chunk of this document.
    pub fn source_label(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// A bounded span of a document's text; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub parent_document_id: String,
    pub text: String,
    pub sequence_index: usize,
    pub source_label: String,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub similarity_score: f32,
}

/// Provenance for an answer: where a piece of context came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub source_label: String,
    pub snippet: String,
}

/// An answer plus the chunks that were handed to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Snippet length (characters) used in [`SourceRef`].
pub const SNIPPET_CHARS: usize = 200;

impl From<&RetrievalResult> for SourceRef {
    fn from(result: &RetrievalResult) -> Self {
        let text = &result.chunk.text;
        let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
        if text.chars().count() > SNIPPET_CHARS {
            snippet.push_str("...");
        }
        SourceRef {
            source_label: result.chunk.source_label.clone(),
            snippet,
        }
    }
}
