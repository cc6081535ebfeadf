//! The answering engine.
//!
//! [`RetrievalEngine`] owns the embedder, the index lifecycle, and the chat
//! client, and exposes the operations callers use:
//!
//! | Operation | Result |
//! |-----------|--------|
//! | [`ensure_index_ready`](RetrievalEngine::ensure_index_ready) | build or load the index |
//! | [`query`](RetrievalEngine::query) | answer text |
//! | [`query_with_sources`](RetrievalEngine::query_with_sources) | answer plus source snippets |
//! | [`search`](RetrievalEngine::search) | ranked chunks, no generation |
//! | [`stats`](RetrievalEngine::stats) | index and model summary |
//!
//! Query operations never fail. Retrieval problems degrade to an empty
//! context and generation problems to a localized fallback sentence.
//!
//! ```rust,no_run
//! # async fn demo() -> qbot_rag::error::Result<()> {
//! use qbot_rag::config::Config;
//! use qbot_rag::engine::RetrievalEngine;
//!
//! let engine = RetrievalEngine::new(Config::default())?;
//! engine.ensure_index_ready(false).await?;
//! println!("{}", engine.query("What is Hạ Long Bay known for?").await);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::IndexMetadata;
use crate::language::{detect, Language};
use crate::lifecycle::IndexManager;
use crate::llm::{ChatTransport, HttpChatClient};
use crate::models::{Answer, RetrievalResult, SourceRef};
use crate::prompts;
use crate::retrieve::Retriever;
use crate::stats::IndexStats;
use crate::synthesize::AnswerSynthesizer;

pub struct RetrievalEngine {
    config: Config,
    manager: IndexManager,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl RetrievalEngine {
    /// Build an engine with the embedder and chat client named in `config`.
    ///
    /// Fails with [`RagError::ModelLoad`] when the embedding provider cannot
    /// be created.
    pub fn new(config: Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let transport: Arc<dyn ChatTransport> = Arc::new(HttpChatClient::new(&config.llm)?);
        Self::with_parts(config, embedder, transport)
    }

    /// Build an engine around caller-supplied components.
    pub fn with_parts(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Self> {
        let manager = IndexManager::new(&config, embedder)?;
        let retriever = Retriever::from_config(&config.retrieval);
        let synthesizer = AnswerSynthesizer::new(transport, &config.llm, &config.assistant);
        Ok(Self {
            config,
            manager,
            retriever,
            synthesizer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    pub async fn ensure_index_ready(&self, force: bool) -> Result<()> {
        self.manager.ensure_ready(force).await
    }

    /// Answer `text`, discarding provenance.
    pub async fn query(&self, text: &str) -> String {
        self.query_with_sources(text).await.answer
    }

    /// Answer `text` and report which chunks were given to the model.
    pub async fn query_with_sources(&self, text: &str) -> Answer {
        if text.trim().is_empty() {
            return Answer {
                answer: prompts::invalid_query(Language::Vi).to_string(),
                sources: Vec::new(),
            };
        }

        let lang = detect(text);
        let retrieved = match self.search(text).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
        };
        debug!("Retrieved {} chunk(s) for {} query", retrieved.len(), lang);

        let answer = self.synthesizer.answer(text, &retrieved, lang).await;
        Answer {
            answer,
            sources: retrieved.iter().map(SourceRef::from).collect(),
        }
    }

    /// Rank chunks for `text` without calling the chat model.
    ///
    /// Loads or builds the index first if none is live.
    pub async fn search(&self, text: &str) -> Result<Vec<RetrievalResult>> {
        let index = match self.manager.current() {
            Some(index) => index,
            None => {
                self.manager.ensure_ready(false).await?;
                self.manager
                    .current()
                    .ok_or_else(|| RagError::Index("index not available".to_string()))?
            }
        };
        let query = self.manager.embedder().embed_one(text).await?;
        Ok(self.retriever.retrieve(&index, &query))
    }

    pub fn stats(&self) -> IndexStats {
        let index_path = self.manager.index_path().to_path_buf();
        let index_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
        let metadata = self
            .manager
            .metadata()
            .or_else(|| IndexMetadata::read(&self.config.index.metadata_path()).ok());

        IndexStats {
            state: self.manager.state(),
            corpus_dir: self.manager.corpus_dir().to_path_buf(),
            index_path,
            index_bytes,
            embedding_model: self.manager.embedder().model_name().to_string(),
            llm_model: self.synthesizer.model().to_string(),
            document_count: 0,
            chunk_count: 0,
            chunk_size: self.config.chunking.chunk_size,
            chunk_overlap: self.config.chunking.chunk_overlap,
            last_build_time: None,
        }
        .with_metadata(metadata.as_ref())
    }
}
