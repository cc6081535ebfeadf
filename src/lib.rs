//! # QBot RAG
//!
//! Retrieval-augmented answering over a small, local document corpus.
//!
//! Documents in a corpus directory are normalized to text, chunked, embedded,
//! and kept in an in-memory vector index that is persisted to disk and
//! rebuilt only when the corpus or the indexing settings change. Questions
//! are answered by a chat-completion model constrained to the retrieved
//! context, in the language the question was asked in.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌─────────────┐
//! │  Loader  │──▶│ Chunker │──▶│ Embedder │──▶│ VectorIndex │
//! │ txt/csv/ │   │         │   │          │   │ index.bin + │
//! │ json/pdf │   └─────────┘   └──────────┘   │ metadata    │
//! └──────────┘                      ▲         └──────┬──────┘
//!                                   │                │
//!                 query ──language──┴──▶ Retriever ◀─┘
//!                                            │
//!                                            ▼
//!                                   AnswerSynthesizer ──▶ chat API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | Corpus directory scan |
//! | [`extract`] | Per-format text normalization |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index and persistence |
//! | [`lifecycle`] | Staleness checks, rebuild, hot swap |
//! | [`retrieve`] | Top-k similarity search |
//! | [`language`] | Query language detection |
//! | [`prompts`] | Localized prompt text |
//! | [`llm`] | Chat-completion client |
//! | [`synthesize`] | Answer generation and cleanup |
//! | [`engine`] | Public entry point |
//! | [`stats`] | Index statistics |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod language;
pub mod lifecycle;
pub mod llm;
pub mod loader;
pub mod models;
pub mod prompts;
pub mod retrieve;
pub mod stats;
pub mod synthesize;
