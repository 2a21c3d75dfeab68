use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

use slope_core::traits::RelevanceScorer;
use slope_core::types::Chunk;

pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
    timeout: Duration,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    /// Score every `(query, chunk.text)` pair and keep the best `top_n`.
    /// Equal scores keep their input order.
    pub async fn rerank(&self, query: &str, chunks: Vec<Chunk>, top_n: usize) -> Result<Vec<Chunk>> {
        if chunks.is_empty() {
            return Ok(vec![]);
        }
        let scorer = self.scorer.clone();
        let query = query.to_string();
        let passages: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let task = tokio::task::spawn_blocking(move || scorer.score(&query, &passages));
        let scores = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined??,
            Err(_) => return Err(anyhow!("reranking timed out after {:?}", self.timeout)),
        };
        if scores.len() != chunks.len() {
            return Err(anyhow!("scorer returned {} scores for {} passages", scores.len(), chunks.len()));
        }
        let total = chunks.len();
        // a NaN score ranks last
        let mut scored: Vec<(Chunk, f32)> = chunks.into_iter().zip(scores.into_iter().map(|s| if s.is_nan() { f32::NEG_INFINITY } else { s })).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);
        tracing::info!(candidates = total, kept = scored.len(), top_score = scored.first().map(|s| s.1).unwrap_or(0.0), "Reranked");
        Ok(scored.into_iter().map(|(c, _)| c).collect())
    }
}
