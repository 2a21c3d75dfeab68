//! slope-embed
//!
//! Model services on candle: a BGE bi-encoder for the vector index and a
//! cross-encoder for reranking. Both load their weights lazily, exactly once,
//! behind [`lazy::LazyModel`]. `use_fake_models` swaps in the deterministic
//! fakes from [`fake`].

pub mod bert;
pub mod cross_encoder;
pub mod device;
pub mod fake;
pub mod lazy;
pub mod pool;
pub mod tokenize;

pub use bert::BgeEmbedder;
pub use cross_encoder::CrossEncoderScorer;
pub use device::select_device;
pub use fake::{HashEmbedder, TermOverlapScorer};
pub use lazy::LazyModel;
pub use pool::{cls_l2, masked_mean_l2, Pooling};

use anyhow::Result;
use std::sync::Arc;

use slope_core::config::Settings;
use slope_core::traits::{Embedder, RelevanceScorer};

pub fn load_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake_models {
        tracing::info!("Using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::default()));
    }
    let device = select_device(&settings.device)?;
    let dir = settings.embedding_model_dir();
    tracing::info!(model = %dir.display(), "Embedding model configured");
    Ok(Arc::new(BgeEmbedder::new(&dir, settings.query_instruction.clone(), device)?))
}

pub fn load_scorer(settings: &Settings) -> Result<Arc<dyn RelevanceScorer>> {
    if settings.use_fake_models {
        tracing::info!("Using TermOverlapScorer");
        return Ok(Arc::new(TermOverlapScorer));
    }
    let device = select_device(&settings.device)?;
    let dir = settings.reranker_model_dir();
    tracing::info!(model = %dir.display(), "Reranker model configured");
    Ok(Arc::new(CrossEncoderScorer::new(&dir, device)?))
}
