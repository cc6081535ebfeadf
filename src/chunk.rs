//! Text chunking.
//!
//! Two strategies, selected by `chunking.strategy`:
//!
//! - **paragraph**: every non-blank, blank-line-separated section becomes
//!   one chunk, whatever its length.
//! - **recursive**: a sliding window bounded by `chunk_size` characters.
//!   Text is split on the first separator from `["\n\n", "\n", " ", ""]` that
//!   occurs in it; pieces shorter than `chunk_size` are merged greedily, and
//!   pieces that are still too long are split again with the remaining
//!   separators. Each new chunk starts with up to `chunk_overlap` characters
//!   of trailing pieces from the previous one.
//!
//! Lengths are counted in `char`s, not bytes, so Vietnamese text with
//! combining diacritics is measured the way a reader would count it.
//!
//! # Example
//!
//! ```rust
//! use qbot_rag::chunk::{ChunkStrategy, Chunker};
//!
//! let chunker = Chunker::new(ChunkStrategy::Paragraph, 1000, 200);
//! let chunks = chunker.split("Bãi Cháy.\n\nTuần Châu.", "beaches.txt", "doc-1");
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].sequence_index, 1);
//! ```

use std::collections::VecDeque;

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::{RagError, Result};
use crate::models::{Chunk, SourceDocument};

/// Separators tried in order by the recursive strategy.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Paragraph,
    Recursive,
}

impl ChunkStrategy {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "paragraph" => Ok(ChunkStrategy::Paragraph),
            "recursive" => Ok(ChunkStrategy::Recursive),
            other => Err(RagError::Config(format!(
                "unknown chunking strategy '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Paragraph => "paragraph",
            ChunkStrategy::Recursive => "recursive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy,
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let strategy = ChunkStrategy::parse(&config.strategy)?;
        Ok(Self::new(strategy, config.chunk_size, config.chunk_overlap))
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Split a loaded document, tagging chunks with its file name.
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        self.split(&doc.raw_text, &doc.source_label(), &doc.id)
    }

    /// Split `text` into chunks with contiguous `sequence_index` from 0.
    pub fn split(&self, text: &str, source_label: &str, parent_id: &str) -> Vec<Chunk> {
        let pieces = match self.strategy {
            ChunkStrategy::Paragraph => split_paragraphs(text),
            ChunkStrategy::Recursive => {
                let normalized = text.replace("\r\n", "\n");
                recursive_split(&normalized, &SEPARATORS, self.chunk_size, self.chunk_overlap)
            }
        };

        pieces
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .enumerate()
            .map(|(i, text)| make_chunk(parent_id, source_label, i, text))
            .collect()
    }
}

/// Non-blank, trimmed sections separated by one or more blank lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                sections.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        sections.push(current.join("\n").trim().to_string());
    }
    sections
}

fn recursive_split(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let sep_idx = separators
        .iter()
        .position(|s| s.is_empty() || text.contains(s))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(sep_idx).copied().unwrap_or("");
    let remaining = separators.get(sep_idx + 1..).unwrap_or(&[]);

    let splits: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut good: Vec<&str> = Vec::new();
    for piece in splits {
        if char_len(piece) < size {
            good.push(piece);
            continue;
        }
        if !good.is_empty() {
            chunks.extend(merge_splits(&good, separator, size, overlap));
            good.clear();
        }
        if remaining.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(recursive_split(piece, remaining, size, overlap));
        }
    }
    if !good.is_empty() {
        chunks.extend(merge_splits(&good, separator, size, overlap));
    }
    chunks
}

/// Greedily join small pieces into chunks of at most `size` characters,
/// carrying up to `overlap` characters of trailing pieces into the next one.
fn merge_splits(splits: &[&str], separator: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in splits {
        let len = char_len(piece);
        let joiner = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

        if total + len + joiner(&current) > size && !current.is_empty() {
            if let Some(doc) = join_trimmed(&current, separator) {
                docs.push(doc);
            }
            while total > overlap || (total > 0 && total + len + joiner(&current) > size) {
                let Some(first) = current.front() else {
                    break;
                };
                let dropped = char_len(first) + if current.len() > 1 { sep_len } else { 0 };
                total = total.saturating_sub(dropped);
                current.pop_front();
            }
        }

        current.push_back(piece);
        total += len + if current.len() > 1 { sep_len } else { 0 };
    }

    if let Some(doc) = join_trimmed(&current, separator) {
        docs.push(doc);
    }
    docs
}

fn join_trimmed(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(parent_id: &str, source_label: &str, index: usize, text: String) -> Chunk {
    let key = format!("{}:{}", parent_id, index);
    Chunk {
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string(),
        parent_document_id: parent_id.to_string(),
        text,
        sequence_index: index,
        source_label: source_label.to_string(),
    }
}
