//! Top-k similarity retrieval over a [`VectorIndex`].

use tracing::warn;

use crate::config::RetrievalConfig;
use crate::embedding::cosine_similarity;
use crate::index::VectorIndex;
use crate::models::RetrievalResult;

/// Retrieval parameters, usually taken from `[retrieval]`.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    pub top_k: usize,
    pub min_score: f32,
}

impl Retriever {
    pub fn new(top_k: usize, min_score: f32) -> Self {
        Self { top_k, min_score }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.top_k, config.min_score)
    }

    pub fn retrieve(&self, index: &VectorIndex, query: &[f32]) -> Vec<RetrievalResult> {
        retrieve(index, query, self.top_k, self.min_score)
    }
}

/// Score every entry against `query` and return the best `k` with score
/// `>= min_score`, highest first.
///
/// Ties keep index insertion order. A query whose length differs from the
/// index dims yields no results.
pub fn retrieve(
    index: &VectorIndex,
    query: &[f32],
    k: usize,
    min_score: f32,
) -> Vec<RetrievalResult> {
    if k == 0 || index.is_empty() {
        return Vec::new();
    }
    if query.len() != index.dims() {
        warn!(
            "Query vector has {} dims but index {} has {}; returning no results",
            query.len(),
            index.model(),
            index.dims()
        );
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = index
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let score = cosine_similarity(query, &entry.vector);
            // Non-finite vectors score NaN; rank them last so the filter drops them.
            (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
        })
        .collect();

    // sort_by is stable.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    scored
        .into_iter()
        .filter(|(_, score)| *score >= min_score)
        .map(|(i, score)| RetrievalResult {
            chunk: index.entries()[i].chunk.clone(),
            similarity_score: score,
        })
        .collect()
}
