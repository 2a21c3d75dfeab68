//! Remote lexical backend speaking the Elasticsearch REST API.
//!
//! Documents live in the `slope_docs` index; ranking is whatever the engine's
//! `match` query returns. Persistence is owned by the engine, so `save` and
//! `load` do nothing.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use slope_core::error::Error;
use slope_core::traits::LexicalIndex;
use slope_core::types::{Chunk, ScoredChunk, SourceKind};

pub const INDEX_NAME: &str = "slope_docs";

pub struct ElasticIndex {
	client: Client,
	base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
	hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
	#[serde(default)]
	hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
	#[serde(rename = "_score", default)]
	score: Option<f32>,
	#[serde(rename = "_source")]
	source: Chunk,
}

impl ElasticIndex {
	/// Ping the engine and make sure the index exists. Any failure here means
	/// the caller should fall back to the local backend.
	pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
		let client = Client::builder().timeout(timeout).build()?;
		let es = Self { client, base_url: base_url.trim_end_matches('/').to_string() };
		let resp = es.client.get(&es.base_url).send().await.map_err(|e| Error::Backend(format!("ping {} failed: {}", es.base_url, e)))?;
		if !resp.status().is_success() {
			return Err(Error::Backend(format!("ping {} returned {}", es.base_url, resp.status())).into());
		}
		es.ensure_index().await?;
		Ok(es)
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path)
	}

	async fn ensure_index(&self) -> Result<()> {
		let head = self.client.head(self.url(INDEX_NAME)).send().await?;
		if head.status().is_success() {
			return Ok(());
		}
		if head.status() != StatusCode::NOT_FOUND {
			return Err(anyhow!("index lookup returned {}", head.status()));
		}
		let body = json!({
			"mappings": {
				"properties": {
					"text": { "type": "text", "analyzer": "standard" },
					"doc_id": { "type": "keyword" },
					"page": { "type": "integer" },
					"id": { "type": "keyword" }
				}
			}
		});
		let resp = self.client.put(self.url(INDEX_NAME)).json(&body).send().await?;
		if !resp.status().is_success() {
			let status = resp.status();
			let text = resp.text().await.unwrap_or_default();
			return Err(anyhow!("index creation returned {}: {}", status, text));
		}
		tracing::info!(index = INDEX_NAME, "Created Elasticsearch index");
		Ok(())
	}
}

/// `_bulk` body: one action line and one source line per chunk.
fn bulk_body(chunks: &[Chunk]) -> Result<String> {
	let mut body = String::new();
	for c in chunks {
		body.push_str(&serde_json::to_string(&json!({ "index": { "_index": INDEX_NAME } }))?);
		body.push('\n');
		body.push_str(&serde_json::to_string(c)?);
		body.push('\n');
	}
	Ok(body)
}

#[async_trait]
impl LexicalIndex for ElasticIndex {
	fn backend(&self) -> &'static str { "elasticsearch" }

	async fn add(&self, chunks: &[Chunk]) -> Result<()> {
		if chunks.is_empty() {
			return Ok(());
		}
		let resp = self
			.client
			.post(self.url("_bulk"))
			.header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
			.body(bulk_body(chunks)?)
			.send()
			.await?;
		if !resp.status().is_success() {
			return Err(anyhow!("bulk index returned {}", resp.status()));
		}
		let report: serde_json::Value = resp.json().await?;
		if report.get("errors").and_then(|v| v.as_bool()).unwrap_or(false) {
			tracing::warn!(count = chunks.len(), "Elasticsearch reported per-item bulk errors");
		}
		self.client.post(self.url(&format!("{}/_refresh", INDEX_NAME))).send().await?;
		tracing::info!(added = chunks.len(), "Indexed chunks in Elasticsearch");
		Ok(())
	}

	async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
		if k == 0 || query.trim().is_empty() {
			return Ok(vec![]);
		}
		let body = json!({ "query": { "match": { "text": query } }, "size": k });
		let resp = self.client.post(self.url(&format!("{}/_search", INDEX_NAME))).json(&body).send().await?;
		if !resp.status().is_success() {
			return Err(anyhow!("search returned {}", resp.status()));
		}
		let parsed: SearchResponse = resp.json().await?;
		Ok(parsed
			.hits
			.hits
			.into_iter()
			.map(|h| ScoredChunk { chunk: h.source, score: h.score.unwrap_or(0.0), source: SourceKind::Lexical })
			.collect())
	}

	async fn save(&self, _dir: &Path) -> Result<()> { Ok(()) }

	async fn load(&self, _dir: &Path) -> Result<()> { Ok(()) }
}
