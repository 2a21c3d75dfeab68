//! Retrieval evaluation over a JSONL question set.
//!
//! Identifiers are `doc_id:page`; metrics are computed on the reranked
//! shortlist of the raw question, then the full pipeline is run for the record.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::answer::Citation;
use crate::pipeline::{QueryResponse, RagPipeline};

pub const RESULTS_FILE: &str = "eval_results.json";

#[derive(Debug, Clone, Deserialize)]
pub struct EvalQuestion {
    pub question: String,
    #[serde(default)]
    pub answers: Vec<Citation>,
}

pub fn recall_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let top: HashSet<&String> = retrieved.iter().take(k).collect();
    let hits = relevant.iter().filter(|r| top.contains(r)).count();
    hits as f64 / relevant.len() as f64
}

pub fn mrr(retrieved: &[String], relevant: &HashSet<String>) -> f64 {
    retrieved.iter().position(|id| relevant.contains(id)).map(|i| 1.0 / (i as f64 + 1.0)).unwrap_or(0.0)
}

/// Binary-relevance nDCG; a repeated relevant id counts at every position.
pub fn ndcg_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    let gain = |i: usize| 1.0 / ((i as f64) + 2.0).log2();
    let dcg: f64 = retrieved.iter().take(k).enumerate().filter(|(_, id)| relevant.contains(*id)).map(|(i, _)| gain(i)).sum();
    let idcg: f64 = (0..relevant.len().min(k)).map(gain).sum();
    if idcg == 0.0 { 0.0 } else { dcg / idcg }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvalSummary {
    #[serde(rename = "recall@1")]
    pub recall_at_1: f64,
    #[serde(rename = "recall@3")]
    pub recall_at_3: f64,
    #[serde(rename = "recall@5")]
    pub recall_at_5: f64,
    pub mrr: f64,
    #[serde(rename = "ndcg@5")]
    pub ndcg_at_5: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionMetrics {
    #[serde(rename = "r@5")]
    pub recall_at_5: f64,
    pub mrr: f64,
    pub ndcg: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalDetail {
    pub query: String,
    pub gold_citations: Vec<String>,
    pub retrieved_ids: Vec<String>,
    pub response: QueryResponse,
    pub metrics: QuestionMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub summary: EvalSummary,
    pub details: Vec<EvalDetail>,
}

pub fn load_questions(path: &Path) -> Result<Vec<EvalQuestion>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line).with_context(|| format!("{}:{}", path.display(), n + 1))?);
    }
    Ok(out)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

pub async fn run_eval(pipeline: &RagPipeline, questions: &[EvalQuestion]) -> Result<EvalReport> {
    let mut details = Vec::with_capacity(questions.len());
    let (mut r1, mut r3, mut r5, mut mrrs, mut ndcgs) = (vec![], vec![], vec![], vec![], vec![]);
    for q in questions {
        let gold: HashSet<String> = q.answers.iter().map(|c| format!("{}:{}", c.doc_id, c.page)).collect();
        let shortlist = pipeline.shortlist(&q.question).await?;
        let retrieved: Vec<String> = shortlist.iter().map(|c| format!("{}:{}", c.doc_id, c.page)).collect();

        let metrics = QuestionMetrics {
            recall_at_5: recall_at_k(&retrieved, &gold, 5),
            mrr: mrr(&retrieved, &gold),
            ndcg: ndcg_at_k(&retrieved, &gold, 5),
        };
        r1.push(recall_at_k(&retrieved, &gold, 1));
        r3.push(recall_at_k(&retrieved, &gold, 3));
        r5.push(metrics.recall_at_5);
        mrrs.push(metrics.mrr);
        ndcgs.push(metrics.ndcg);
        tracing::info!(query = %q.question, r5 = metrics.recall_at_5, mrr = metrics.mrr, "Evaluated question");

        let response = pipeline.run(&q.question).await?;
        let mut gold_citations: Vec<String> = gold.into_iter().collect();
        gold_citations.sort();
        details.push(EvalDetail { query: q.question.clone(), gold_citations, retrieved_ids: retrieved, response, metrics });
    }
    let summary = EvalSummary { recall_at_1: mean(&r1), recall_at_3: mean(&r3), recall_at_5: mean(&r5), mrr: mean(&mrrs), ndcg_at_5: mean(&ndcgs) };
    Ok(EvalReport { summary, details })
}

pub fn write_report(report: &EvalReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(RESULTS_FILE);
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), report)?;
    Ok(path)
}
