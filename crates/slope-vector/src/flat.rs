//! Exact inner-product search over in-memory vectors.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use slope_core::traits::{Embedder, VectorIndex};
use slope_core::types::{Chunk, ScoredChunk, SourceKind};

use crate::store::{read_rows, write_rows};

#[derive(Default)]
struct VectorState {
	chunks: Vec<Chunk>,
	vectors: Vec<Vec<f32>>,
}

impl VectorState {
	fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
		let mut scored: Vec<(usize, f32)> = Vec::with_capacity(self.vectors.len());
		for (pos, v) in self.vectors.iter().enumerate() {
			if v.len() != query.len() {
				return Err(anyhow!("query dim {} does not match index dim {}", query.len(), v.len()));
			}
			scored.push((pos, v.iter().zip(query).map(|(a, b)| a * b).sum()));
		}
		// stable: equal scores keep insertion order
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(k);
		Ok(scored
			.into_iter()
			.map(|(pos, score)| ScoredChunk { chunk: self.chunks[pos].clone(), score, source: SourceKind::Vector })
			.collect())
	}
}

pub struct FlatVectorIndex {
	embedder: Arc<dyn Embedder>,
	embed_timeout: Duration,
	state: RwLock<Arc<VectorState>>,
	add_lock: tokio::sync::Mutex<()>,
}

impl FlatVectorIndex {
	pub fn new(embedder: Arc<dyn Embedder>, embed_timeout: Duration) -> Self {
		Self { embedder, embed_timeout, state: RwLock::new(Arc::new(VectorState::default())), add_lock: tokio::sync::Mutex::new(()) }
	}

	pub fn chunks(&self) -> Vec<Chunk> {
		self.snapshot().chunks.clone()
	}

	fn snapshot(&self) -> Arc<VectorState> {
		self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
	}

	fn swap(&self, next: VectorState) {
		*self.state.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
	}

	/// Run a blocking embedding call on the blocking pool under the embed timeout.
	async fn embed<T, F>(&self, f: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&dyn Embedder) -> Result<T> + Send + 'static,
	{
		let embedder = self.embedder.clone();
		let task = tokio::task::spawn_blocking(move || f(embedder.as_ref()));
		match tokio::time::timeout(self.embed_timeout, task).await {
			Ok(joined) => joined?,
			Err(_) => Err(anyhow!("embedding timed out after {:?}", self.embed_timeout)),
		}
	}
}

fn normalize(v: &mut [f32]) {
	let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
	if norm > 0.0 {
		v.iter_mut().for_each(|x| *x /= norm);
	}
}

#[async_trait]
impl VectorIndex for FlatVectorIndex {
	fn len(&self) -> usize {
		self.snapshot().chunks.len()
	}

	async fn add(&self, chunks: &[Chunk]) -> Result<()> {
		if chunks.is_empty() {
			return Ok(());
		}
		let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
		let mut embeddings = self.embed(move |e| e.embed_documents(&texts)).await?;
		if embeddings.len() != chunks.len() {
			return Err(anyhow!("embedder returned {} vectors for {} chunks", embeddings.len(), chunks.len()));
		}
		embeddings.iter_mut().for_each(|v| normalize(v));

		let _guard = self.add_lock.lock().await;
		let current = self.snapshot();
		if let (Some(existing), Some(new)) = (current.vectors.first(), embeddings.first()) {
			if existing.len() != new.len() {
				return Err(anyhow!("embedding dim {} does not match index dim {}", new.len(), existing.len()));
			}
		}
		let mut next = VectorState { chunks: current.chunks.clone(), vectors: current.vectors.clone() };
		next.chunks.extend_from_slice(chunks);
		next.vectors.extend(embeddings);
		let total = next.chunks.len();
		self.swap(next);
		tracing::info!(added = chunks.len(), total, "Added chunks to vector index");
		Ok(())
	}

	async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
		let snap = self.snapshot();
		if snap.chunks.is_empty() || k == 0 {
			return Ok(vec![]);
		}
		let query = query.to_string();
		let mut q = self.embed(move |e| e.embed_query(&query)).await?;
		normalize(&mut q);
		snap.search(&q, k)
	}

	async fn save(&self, dir: &Path) -> Result<()> {
		let snap = self.snapshot();
		write_rows(dir, &snap.chunks, &snap.vectors).await?;
		tracing::info!(path = %dir.display(), vectors = snap.vectors.len(), "Saved vector index");
		Ok(())
	}

	async fn load(&self, dir: &Path) -> Result<()> {
		let _guard = self.add_lock.lock().await;
		match read_rows(dir).await? {
			Some((chunks, vectors)) => {
				let total = chunks.len();
				self.swap(VectorState { chunks, vectors });
				tracing::info!(path = %dir.display(), vectors = total, "Loaded vector index");
			}
			None => tracing::warn!(path = %dir.display(), "No saved vector index found"),
		}
		Ok(())
	}
}
