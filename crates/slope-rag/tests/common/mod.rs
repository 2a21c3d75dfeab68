#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use slope_core::traits::{LexicalIndex, RelevanceScorer, VectorIndex};
use slope_core::types::Chunk;
use slope_embed::{HashEmbedder, TermOverlapScorer};
use slope_hybrid::{HybridRetriever, Reranker};
use slope_rag::generator::Generator;
use slope_rag::tools::{ToolRunner, WeatherTool, MOCK_WEATHER_KEY};
use slope_rag::{PipelineConfig, RagPipeline};
use slope_text::Bm25Index;
use slope_vector::FlatVectorIndex;

pub fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("sample.pdf", 1, "Full Content", "Heavy rainfall raises pore water pressure and reduces slope stability."),
        Chunk::new("walls.pdf", 2, "Full Content", "Retaining wall drainage keeps backfill dry."),
        Chunk::new("soil.pdf", 5, "Full Content", "Cohesion and friction angle govern shear strength of soil."),
    ]
}

pub fn config() -> PipelineConfig {
    PipelineConfig { retrieve_k: 50, rerank_top_n: 5, max_ctx_chars: 1500, generation_timeout: Duration::from_secs(5) }
}

pub fn indexes() -> (Arc<dyn LexicalIndex>, Arc<dyn VectorIndex>) {
    let lexical: Arc<dyn LexicalIndex> = Arc::new(Bm25Index::new());
    let vector: Arc<dyn VectorIndex> = Arc::new(FlatVectorIndex::new(Arc::new(HashEmbedder::new(256)), Duration::from_secs(5)));
    (lexical, vector)
}

pub fn mock_tools() -> ToolRunner {
    ToolRunner::new(WeatherTool::new("http://127.0.0.1:9", MOCK_WEATHER_KEY, Duration::from_secs(1)).unwrap())
}

pub fn pipeline_over(
    lexical: Arc<dyn LexicalIndex>,
    vector: Arc<dyn VectorIndex>,
    scorer: Arc<dyn RelevanceScorer>,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
) -> RagPipeline {
    let retriever = HybridRetriever::new(lexical, vector, Duration::from_secs(5), Duration::from_secs(5));
    let reranker = Reranker::new(scorer, Duration::from_secs(5));
    RagPipeline::new(mock_tools(), retriever, reranker, generator, config)
}

/// Pipeline over the indexed [`corpus`] with the fake term-overlap scorer.
pub async fn pipeline(generator: Arc<dyn Generator>, config: PipelineConfig) -> RagPipeline {
    let (lexical, vector) = indexes();
    lexical.add(&corpus()).await.unwrap();
    vector.add(&corpus()).await.unwrap();
    pipeline_over(lexical, vector, Arc::new(TermOverlapScorer), generator, config)
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}
