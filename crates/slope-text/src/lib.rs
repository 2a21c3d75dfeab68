//! slope-text
//!
//! Lexical retrieval. The local backend is BM25 over an in-RAM tantivy index
//! that is rebuilt from the full document list on every `add`; the optional
//! remote backend talks to Elasticsearch. [`open_lexical_index`] picks one at
//! startup and falls back to local BM25 when the remote engine is unreachable.

pub mod bm25;
pub mod elastic;
pub mod tantivy_utils;
pub mod tokenizer;

pub use bm25::Bm25Index;
pub use elastic::ElasticIndex;

use std::sync::Arc;
use std::time::Duration;

use slope_core::traits::LexicalIndex;

pub async fn open_lexical_index(elasticsearch_url: Option<&str>, timeout: Duration) -> Arc<dyn LexicalIndex> {
	let Some(url) = elasticsearch_url.filter(|u| !u.trim().is_empty()) else {
		tracing::info!("Elasticsearch URL not set, using local BM25");
		return Arc::new(Bm25Index::new());
	};
	match ElasticIndex::connect(url, timeout).await {
		Ok(es) => {
			tracing::info!(url, "Using Elasticsearch for lexical search");
			Arc::new(es)
		}
		Err(e) => {
			tracing::warn!(url, error = %e, "Elasticsearch not reachable, falling back to local BM25");
			Arc::new(Bm25Index::new())
		}
	}
}
