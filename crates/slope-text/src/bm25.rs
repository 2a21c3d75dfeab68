//! Local BM25 backend.
//!
//! Cost model: every `add` re-tokenizes and re-indexes the whole accumulated
//! corpus (O(corpus size)), because collection statistics change with every
//! document. The rebuild runs on the blocking pool into a fresh in-RAM index;
//! the finished snapshot is swapped in under a write lock, so a concurrent
//! `search` sees either the old or the new corpus, never a partial one.
//!
//! Persistence stores the document list only (`lexical_docs.json`); the
//! ranking structure is rebuilt from it on `load`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use slope_core::traits::LexicalIndex;
use slope_core::types::{Chunk, ScoredChunk, SourceKind};

use crate::tantivy_utils::{analyze, build_analyzer, build_schema, register_tokenizer};

pub const DOCS_FILE: &str = "lexical_docs.json";
const WRITER_HEAP_BYTES: usize = 50_000_000;

struct Indexed {
	searcher: Searcher,
	text_field: Field,
	pos_field: Field,
}

#[derive(Default)]
struct Snapshot {
	documents: Vec<Chunk>,
	indexed: Option<Indexed>,
}

impl Snapshot {
	fn build(documents: Vec<Chunk>) -> Result<Self> {
		if documents.is_empty() {
			return Ok(Self::default());
		}
		let schema = build_schema();
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;
		let pos_field = schema.get_field("pos")?;
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		// one thread keeps a single segment, so doc ids follow insertion order
		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
		for (pos, c) in documents.iter().enumerate() {
			writer.add_document(doc!(
				id_field => c.id.clone(),
				pos_field => pos as u64,
				text_field => c.text.clone(),
			))?;
		}
		writer.commit()?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		let searcher = reader.searcher();
		Ok(Self { documents, indexed: Some(Indexed { searcher, text_field, pos_field }) })
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
		let Some(ix) = &self.indexed else { return Ok(vec![]) };
		if k == 0 { return Ok(vec![]); }
		let terms = analyze(&mut build_analyzer(), query);
		if terms.is_empty() { return Ok(vec![]); }
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(ix.text_field, t), IndexRecordOption::WithFreqs));
				(Occur::Should, q)
			})
			.collect();
		let q = BooleanQuery::new(clauses);
		let top_docs = ix.searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			// a zero score carries no lexical signal
			if score <= 0.0 { continue; }
			let doc: TantivyDocument = ix.searcher.doc(addr)?;
			let pos = doc.get_first(ix.pos_field).and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("indexed document without position"))?;
			let chunk = self.documents.get(pos as usize).ok_or_else(|| anyhow!("position {} outside document list", pos))?;
			hits.push(ScoredChunk { chunk: chunk.clone(), score, source: SourceKind::Lexical });
		}
		Ok(hits)
	}
}

pub struct Bm25Index {
	state: RwLock<Arc<Snapshot>>,
	add_lock: tokio::sync::Mutex<()>,
}

impl Default for Bm25Index {
	fn default() -> Self { Self::new() }
}

impl Bm25Index {
	pub fn new() -> Self {
		Self { state: RwLock::new(Arc::new(Snapshot::default())), add_lock: tokio::sync::Mutex::new(()) }
	}

	pub fn len(&self) -> usize { self.snapshot().documents.len() }

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	pub fn documents(&self) -> Vec<Chunk> { self.snapshot().documents.clone() }

	fn snapshot(&self) -> Arc<Snapshot> {
		self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
	}

	fn swap(&self, next: Snapshot) {
		*self.state.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
	}

	async fn rebuild(&self, documents: Vec<Chunk>) -> Result<()> {
		let next = tokio::task::spawn_blocking(move || Snapshot::build(documents)).await??;
		self.swap(next);
		Ok(())
	}
}

#[async_trait]
impl LexicalIndex for Bm25Index {
	fn backend(&self) -> &'static str { "bm25" }

	async fn add(&self, chunks: &[Chunk]) -> Result<()> {
		let _guard = self.add_lock.lock().await;
		let mut documents = self.snapshot().documents.clone();
		documents.extend_from_slice(chunks);
		let total = documents.len();
		self.rebuild(documents).await?;
		tracing::info!(added = chunks.len(), total, "Rebuilt BM25 index");
		Ok(())
	}

	async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
		let snap = self.snapshot();
		let query = query.to_string();
		tokio::task::spawn_blocking(move || snap.search(&query, k)).await?
	}

	async fn save(&self, dir: &Path) -> Result<()> {
		std::fs::create_dir_all(dir)?;
		let snap = self.snapshot();
		let path = dir.join(DOCS_FILE);
		serde_json::to_writer(BufWriter::new(File::create(&path)?), &snap.documents)?;
		tracing::info!(path = %path.display(), documents = snap.documents.len(), "Saved BM25 documents");
		Ok(())
	}

	async fn load(&self, dir: &Path) -> Result<()> {
		let path = dir.join(DOCS_FILE);
		if !path.exists() {
			tracing::warn!(path = %path.display(), "No saved BM25 documents found");
			return Ok(());
		}
		let documents: Vec<Chunk> = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
		let _guard = self.add_lock.lock().await;
		let total = documents.len();
		self.rebuild(documents).await?;
		tracing::info!(path = %path.display(), documents = total, "Loaded BM25 index");
		Ok(())
	}
}
