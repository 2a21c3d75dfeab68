//! Startup wiring from [`Settings`].
//!
//! Everything fallible happens here, before anything binds or serves: model
//! artifacts are checked, the lexical backend is chosen, and indexes saved by
//! a previous ingest are loaded from `index_dir`.

use anyhow::Result;
use std::sync::Arc;

use slope_core::chunker::Chunker;
use slope_core::config::Settings;
use slope_core::extract::DocumentExtractor;
use slope_core::traits::{LexicalIndex, VectorIndex};
use slope_embed::{load_embedder, load_scorer};
use slope_hybrid::{HybridRetriever, Reranker};
use slope_text::open_lexical_index;
use slope_vector::FlatVectorIndex;

use crate::generator::{build_generator, Generator};
use crate::ingest::IngestService;
use crate::pipeline::{PipelineConfig, RagPipeline};
use crate::tools::{ToolRunner, WeatherTool};

pub struct App {
    pub pipeline: RagPipeline,
    pub ingest: IngestService,
}

/// Indexes only; enough for ingest without a generation backend.
pub async fn open_indexes(settings: &Settings) -> Result<(Arc<dyn LexicalIndex>, Arc<dyn VectorIndex>)> {
    let embedder = load_embedder(settings)?;
    let lexical = open_lexical_index(settings.elasticsearch_url.as_deref(), settings.search_timeout()).await;
    let vector: Arc<dyn VectorIndex> = Arc::new(FlatVectorIndex::new(embedder, settings.embed_timeout()));
    let index_dir = settings.index_dir();
    vector.load(&index_dir).await?;
    lexical.load(&index_dir).await?;
    Ok((lexical, vector))
}

pub fn ingest_service(settings: &Settings, lexical: Arc<dyn LexicalIndex>, vector: Arc<dyn VectorIndex>) -> Result<IngestService> {
    let chunker = Chunker::new(settings.chunking())?;
    Ok(IngestService::new(Box::new(DocumentExtractor::new()), chunker, lexical, vector, settings.index_dir()))
}

pub async fn build(settings: &Settings) -> Result<App> {
    let generator = build_generator(settings)?;
    build_with_generator(settings, generator).await
}

/// Same as [`build`] with a caller-supplied generator.
pub async fn build_with_generator(settings: &Settings, generator: Arc<dyn Generator>) -> Result<App> {
    let (lexical, vector) = open_indexes(settings).await?;
    let scorer = load_scorer(settings)?;
    let retriever = HybridRetriever::new(lexical.clone(), vector.clone(), settings.search_timeout(), settings.embed_timeout());
    let reranker = Reranker::new(scorer, settings.rerank_timeout());
    let weather = WeatherTool::new(&settings.weather_api_url, &settings.weather_api_key, settings.tool_timeout())?;
    let pipeline = RagPipeline::new(ToolRunner::new(weather), retriever, reranker, generator, PipelineConfig::from_settings(settings));
    let ingest = ingest_service(settings, lexical, vector)?;
    tracing::info!(
        generator = pipeline.generator_name(),
        fake_models = settings.use_fake_models,
        index_dir = %settings.index_dir().display(),
        "Pipeline ready"
    );
    Ok(App { pipeline, ingest })
}
