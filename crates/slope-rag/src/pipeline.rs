//! Query path: tools -> hybrid retrieval -> rerank -> grounded generation ->
//! citation validation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use slope_core::types::Chunk;
use slope_hybrid::{HybridRetriever, Reranker};

use crate::answer::{parse_answer, AnswerPayload, Citation};
use crate::citations::validate;
use crate::generator::Generator;
use crate::prompt::build_prompt;
use crate::tools::ToolRunner;

pub const SNIPPET_CHARS: usize = 200;
pub const GENERATION_ERROR: &str = "Error generating response.";
pub const NO_EVIDENCE: &str = "No relevant evidence was found in the indexed documents.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub doc_id: String,
    pub page: u32,
    pub snippet: String,
}

impl Evidence {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self { doc_id: chunk.doc_id.clone(), page: chunk.page, snippet: snippet(&chunk.text) }
    }
}

/// First [`SNIPPET_CHARS`] characters, with `...` only when something was cut.
pub fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() { format!("{}...", head) } else { head }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub risk_level: String,
    pub rationale: String,
    pub citations: Vec<Citation>,
    pub recommendations: Vec<String>,
    pub evidence: Vec<Evidence>,
}

impl QueryResponse {
    fn new(payload: AnswerPayload, shortlist: &[Chunk]) -> Self {
        Self {
            risk_level: payload.risk_level,
            rationale: payload.rationale,
            citations: payload.citations,
            recommendations: payload.recommendations,
            evidence: shortlist.iter().map(Evidence::from_chunk).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub retrieve_k: usize,
    pub rerank_top_n: usize,
    pub max_ctx_chars: usize,
    pub generation_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_settings(s: &slope_core::config::Settings) -> Self {
        Self {
            retrieve_k: s.retrieve_k,
            rerank_top_n: s.rerank_top_n,
            max_ctx_chars: s.max_ctx_tokens,
            generation_timeout: s.generation_timeout(),
        }
    }
}

pub struct RagPipeline {
    tools: ToolRunner,
    retriever: HybridRetriever,
    reranker: Reranker,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(tools: ToolRunner, retriever: HybridRetriever, reranker: Reranker, generator: Arc<dyn Generator>, config: PipelineConfig) -> Self {
        Self { tools, retriever, reranker, generator, config }
    }

    pub fn retriever(&self) -> &HybridRetriever { &self.retriever }

    pub fn generator_name(&self) -> &'static str { self.generator.name() }

    /// Retrieve then rerank. A reranker failure keeps the fused order.
    pub async fn shortlist(&self, query: &str) -> Result<Vec<Chunk>> {
        let candidates = self.retriever.retrieve(query, self.config.retrieve_k).await?;
        match self.reranker.rerank(query, candidates.clone(), self.config.rerank_top_n).await {
            Ok(shortlist) => Ok(shortlist),
            Err(e) => {
                tracing::warn!(error = %e, "Reranking failed, keeping fused order");
                Ok(candidates.into_iter().take(self.config.rerank_top_n).collect())
            }
        }
    }

    pub async fn run(&self, question: &str) -> Result<QueryResponse> {
        tracing::info!(query = question, "Starting RAG pipeline");
        let query = self.tools.enrich(question).await;
        let shortlist = self.shortlist(&query).await?;
        if shortlist.is_empty() {
            tracing::warn!("No evidence retrieved, skipping generation");
            return Ok(QueryResponse::new(AnswerPayload::fallback(NO_EVIDENCE), &shortlist));
        }

        let prompt = build_prompt(&query, &shortlist, self.config.max_ctx_chars);
        let raw = match tokio::time::timeout(self.config.generation_timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(raw)) => Some(raw),
            Ok(Err(e)) => {
                tracing::error!(generator = self.generator.name(), error = %e, "Generation failed");
                None
            }
            Err(_) => {
                tracing::error!(generator = self.generator.name(), timeout = ?self.config.generation_timeout, "Generation timed out");
                None
            }
        };

        let mut payload = match raw {
            Some(raw) => {
                let outcome = parse_answer(&raw);
                if outcome.is_fallback() {
                    tracing::warn!("Generator output had no JSON payload, using fallback");
                }
                outcome.into_payload()
            }
            None => AnswerPayload::fallback(GENERATION_ERROR),
        };
        validate(&mut payload, &shortlist);
        tracing::info!(risk = %payload.risk_level, citations = payload.citations.len(), evidence = shortlist.len(), "Answer ready");
        Ok(QueryResponse::new(payload, &shortlist))
    }
}
