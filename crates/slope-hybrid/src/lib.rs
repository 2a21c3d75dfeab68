//! slope-hybrid
//!
//! Combines the lexical and vector indexes into one ranking
//! (`0.7 * vector + 0.3 * lexical` over min-max normalised scores) and
//! rescores the fused candidates with a pairwise relevance model.

pub mod rerank;
pub mod retriever;

pub use rerank::Reranker;
pub use retriever::{fuse, min_max_normalize, FusedChunk, FusionWeights, HybridRetriever};
