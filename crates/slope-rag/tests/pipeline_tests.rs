mod common;

use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

use slope_core::traits::RelevanceScorer;
use slope_rag::answer::{Citation, UNKNOWN_RISK};
use slope_rag::pipeline::{snippet, GENERATION_ERROR, NO_EVIDENCE, SNIPPET_CHARS};
use slope_rag::ScriptedGenerator;

use common::{config, corpus, indexes, pipeline, pipeline_over};

const GROUNDED_REPLY: &str = r#"Based on the evidence:
{"risk_level": "high",
 "rationale": "Rainfall raises pore pressure.",
 "citations": [{"doc_id": "sample.pdf", "page": 1}, {"doc_id": "other.pdf", "page": 9}],
 "recommendations": ["Improve drainage", "Monitor piezometers"]}"#;

#[tokio::test]
async fn rainfall_question_keeps_only_backed_citation() {
    let generator = Arc::new(ScriptedGenerator::new(GROUNDED_REPLY));
    let p = pipeline(generator.clone(), config()).await;

    let resp = p.run("How does rainfall affect slope stability?").await.unwrap();

    assert_eq!(resp.risk_level, "high");
    assert_eq!(resp.citations, vec![Citation::new("sample.pdf", 1)]);
    assert_eq!(resp.recommendations.len(), 2);
    assert_eq!(resp.evidence[0].doc_id, "sample.pdf");
    assert_eq!(resp.evidence[0].page, 1);
    assert!(resp.evidence[0].snippet.starts_with("Heavy rainfall"));

    assert_eq!(generator.calls(), 1);
    let prompt = &generator.prompts()[0];
    assert!(prompt.user.contains("Doc ID: sample.pdf\nPage: 1"));
    // "rain" triggers the weather tool, whose mock result is appended
    assert!(prompt.user.contains("当前天气状况"));
}

#[tokio::test]
async fn string_pages_are_coerced() {
    let reply = r#"{"risk_level": "medium", "rationale": "r", "citations": [{"doc_id": "soil.pdf", "page": "5"}, {"doc_id": "soil.pdf", "page": 5.0}], "recommendations": []}"#;
    let p = pipeline(Arc::new(ScriptedGenerator::new(reply)), config()).await;
    let resp = p.run("cohesion friction angle of soil").await.unwrap();
    assert_eq!(resp.citations, vec![Citation::new("soil.pdf", 5), Citation::new("soil.pdf", 5)]);
}

#[tokio::test]
async fn empty_corpus_skips_generation() {
    let generator = Arc::new(ScriptedGenerator::new(GROUNDED_REPLY));
    let (lexical, vector) = indexes();
    let p = pipeline_over(lexical, vector, Arc::new(slope_embed::TermOverlapScorer), generator.clone(), config());

    let resp = p.run("Is the slope stable?").await.unwrap();

    assert_eq!(resp.risk_level, UNKNOWN_RISK);
    assert_eq!(resp.rationale, NO_EVIDENCE);
    assert!(resp.citations.is_empty());
    assert!(resp.evidence.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn non_json_output_degrades_gracefully() {
    let raw = "The slope looks risky but I cannot format this.";
    let p = pipeline(Arc::new(ScriptedGenerator::new(raw)), config()).await;
    let resp = p.run("slope stability").await.unwrap();
    assert_eq!(resp.risk_level, UNKNOWN_RISK);
    assert_eq!(resp.rationale, raw);
    assert!(resp.citations.is_empty());
    assert!(resp.recommendations.is_empty());
    assert!(!resp.evidence.is_empty());
}

#[tokio::test]
async fn generator_error_becomes_fallback() {
    let p = pipeline(Arc::new(ScriptedGenerator::failing("backend down")), config()).await;
    let resp = p.run("slope stability").await.unwrap();
    assert_eq!(resp.risk_level, UNKNOWN_RISK);
    assert_eq!(resp.rationale, GENERATION_ERROR);
    assert!(!resp.evidence.is_empty());
}

#[tokio::test]
async fn generator_timeout_becomes_fallback() {
    let generator = Arc::new(ScriptedGenerator::new(GROUNDED_REPLY).with_delay(Duration::from_millis(500)));
    let mut cfg = config();
    cfg.generation_timeout = Duration::from_millis(50);
    let p = pipeline(generator, cfg).await;
    let resp = p.run("slope stability").await.unwrap();
    assert_eq!(resp.rationale, GENERATION_ERROR);
    assert!(resp.citations.is_empty());
}

#[tokio::test]
async fn shortlist_respects_top_n() {
    let mut cfg = config();
    cfg.rerank_top_n = 2;
    let p = pipeline(Arc::new(ScriptedGenerator::new("{}")), cfg).await;
    let shortlist = p.shortlist("slope soil drainage").await.unwrap();
    assert_eq!(shortlist.len(), 2);
}

struct BrokenScorer;

impl RelevanceScorer for BrokenScorer {
    fn score(&self, _query: &str, _passages: &[String]) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("model crashed"))
    }
}

#[tokio::test]
async fn reranker_failure_keeps_fused_order() {
    let (lexical, vector) = indexes();
    lexical.add(&corpus()).await.unwrap();
    vector.add(&corpus()).await.unwrap();
    let mut cfg = config();
    cfg.rerank_top_n = 2;
    let p = pipeline_over(lexical, vector, Arc::new(BrokenScorer), Arc::new(ScriptedGenerator::new("{}")), cfg);

    let fused = p.retriever().retrieve("rainfall slope stability", 50).await.unwrap();
    let shortlist = p.shortlist("rainfall slope stability").await.unwrap();
    assert_eq!(shortlist.len(), 2);
    assert_eq!(shortlist, fused[..2].to_vec());
}

#[test]
fn snippet_marks_truncation_only() {
    assert_eq!(snippet("short"), "short");
    let exact: String = "x".repeat(SNIPPET_CHARS);
    assert_eq!(snippet(&exact), exact);
    let long: String = "坡".repeat(SNIPPET_CHARS + 1);
    let s = snippet(&long);
    assert!(s.ends_with("..."));
    assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
}
