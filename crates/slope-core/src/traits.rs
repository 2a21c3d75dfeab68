use std::path::Path;

use async_trait::async_trait;

use crate::types::{Chunk, ScoredChunk};

/// Bi-encoder embedding service. Vectors are L2-normalised.
///
/// Documents and queries go through separate paths because the query side may
/// carry an instruction prefix the document side does not.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    fn embed_query(&self, query: &str) -> anyhow::Result<Vec<f32>>;
}

/// Cross-encoder style pairwise relevance model; one score per passage.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Short backend label used in logs ("bm25", "elasticsearch").
    fn backend(&self) -> &'static str;
    async fn add(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredChunk>>;
    async fn save(&self, dir: &Path) -> anyhow::Result<()>;
    async fn load(&self, dir: &Path) -> anyhow::Result<()>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    async fn add(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredChunk>>;
    async fn save(&self, dir: &Path) -> anyhow::Result<()>;
    async fn load(&self, dir: &Path) -> anyhow::Result<()>;
}
