use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use slope_core::traits::{LexicalIndex, VectorIndex};
use slope_core::types::{Chunk, ChunkId, ScoredChunk};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub vector: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { vector: 0.7, lexical: 0.3 }
    }
}

/// A candidate after fusion, with the normalised per-index terms it was built from.
#[derive(Debug, Clone)]
pub struct FusedChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub vector: f32,
    pub lexical: f32,
}

/// Min-max normalise scores into `[0, 1]`, keyed by chunk id.
///
/// A constant score list maps every entry to `1.0`. When an id repeats, the
/// last occurrence's value is kept.
pub fn min_max_normalize(results: &[ScoredChunk]) -> HashMap<ChunkId, f32> {
    let mut out = HashMap::with_capacity(results.len());
    let Some(first) = results.first() else { return out };
    let (min, max) = results.iter().fold((first.score, first.score), |(lo, hi), r| (lo.min(r.score), hi.max(r.score)));
    for r in results {
        let v = if max == min { 1.0 } else { (r.score - min) / (max - min) };
        out.insert(r.chunk.id.clone(), v);
    }
    out
}

/// Weighted fusion of the two normalised result lists.
///
/// Keys are visited in first-seen order, vector results before lexical ones;
/// the sort is stable so that order breaks score ties. When a key repeats the
/// most recently seen chunk object is the one returned.
pub fn fuse(vector: &[ScoredChunk], lexical: &[ScoredChunk], k: usize, weights: FusionWeights) -> Vec<FusedChunk> {
    let vec_norm = min_max_normalize(vector);
    let lex_norm = min_max_normalize(lexical);

    let mut order: Vec<ChunkId> = Vec::new();
    let mut chunks: HashMap<ChunkId, Chunk> = HashMap::new();
    for r in vector.iter().chain(lexical) {
        if chunks.insert(r.chunk.id.clone(), r.chunk.clone()).is_none() {
            order.push(r.chunk.id.clone());
        }
    }

    let mut fused: Vec<FusedChunk> = order
        .into_iter()
        .filter_map(|id| {
            let chunk = chunks.remove(&id)?;
            let v = vec_norm.get(&id).copied().unwrap_or(0.0);
            let l = lex_norm.get(&id).copied().unwrap_or(0.0);
            Some(FusedChunk { chunk, score: weights.vector * v + weights.lexical * l, vector: v, lexical: l })
        })
        .collect();
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(k);
    fused
}

pub struct HybridRetriever {
    lexical: Arc<dyn LexicalIndex>,
    vector: Arc<dyn VectorIndex>,
    lexical_timeout: Duration,
    vector_timeout: Duration,
    weights: FusionWeights,
}

impl HybridRetriever {
    pub fn new(lexical: Arc<dyn LexicalIndex>, vector: Arc<dyn VectorIndex>, lexical_timeout: Duration, vector_timeout: Duration) -> Self {
        Self { lexical, vector, lexical_timeout, vector_timeout, weights: FusionWeights::default() }
    }

    pub fn lexical(&self) -> &Arc<dyn LexicalIndex> { &self.lexical }

    pub fn vector(&self) -> &Arc<dyn VectorIndex> { &self.vector }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self.retrieve_scored(query, k).await?.into_iter().map(|f| f.chunk).collect())
    }

    /// Query both indexes concurrently; an index that errors or times out
    /// contributes no candidates.
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<FusedChunk>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let (vector_hits, lexical_hits) = tokio::join!(
            bounded("vector", self.vector_timeout, self.vector.search(query, k)),
            bounded(self.lexical.backend(), self.lexical_timeout, self.lexical.search(query, k)),
        );
        let fused = fuse(&vector_hits, &lexical_hits, k, self.weights);
        tracing::info!(vector = vector_hits.len(), lexical = lexical_hits.len(), fused = fused.len(), "Hybrid retrieval");
        Ok(fused)
    }
}

async fn bounded<F>(label: &str, timeout: Duration, search: F) -> Vec<ScoredChunk>
where
    F: Future<Output = Result<Vec<ScoredChunk>>>,
{
    let outcome = match tokio::time::timeout(timeout, search).await {
        Ok(r) => r,
        Err(_) => Err(anyhow!("timed out after {:?}", timeout)),
    };
    outcome.unwrap_or_else(|e| {
        tracing::warn!(index = label, error = %e, "Index search failed, continuing without it");
        Vec::new()
    })
}
