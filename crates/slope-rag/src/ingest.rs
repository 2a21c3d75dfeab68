//! Directory ingest: scan, extract, chunk, index, persist.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slope_core::chunker::Chunker;
use slope_core::extract::{list_documents, Extractor};
use slope_core::traits::{LexicalIndex, VectorIndex};
use slope_core::types::Chunk;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub message: String,
    pub files_processed: usize,
    pub chunks_created: usize,
}

pub struct IngestService {
    extractor: Box<dyn Extractor>,
    chunker: Chunker,
    lexical: Arc<dyn LexicalIndex>,
    vector: Arc<dyn VectorIndex>,
    index_dir: PathBuf,
    ingest_lock: tokio::sync::Mutex<()>,
}

impl IngestService {
    pub fn new(extractor: Box<dyn Extractor>, chunker: Chunker, lexical: Arc<dyn LexicalIndex>, vector: Arc<dyn VectorIndex>, index_dir: PathBuf) -> Self {
        Self { extractor, chunker, lexical, vector, index_dir, ingest_lock: tokio::sync::Mutex::new(()) }
    }

    pub async fn ingest(&self, data_dir: &Path) -> Result<IngestReport> {
        self.ingest_with_progress(data_dir, &ProgressBar::hidden()).await
    }

    /// `progress` advances once per file found.
    pub async fn ingest_with_progress(&self, data_dir: &Path, progress: &ProgressBar) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let files = list_documents(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "No files found to ingest");
            return Ok(IngestReport { message: "No files found".to_string(), files_processed: 0, chunks_created: 0 });
        }

        progress.set_length(files.len() as u64);
        let mut chunks: Vec<Chunk> = Vec::new();
        for path in &files {
            progress.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
            chunks.extend(self.process_file(path));
            progress.inc(1);
        }
        progress.finish_with_message("extraction done");

        if !chunks.is_empty() {
            self.vector.add(&chunks).await.context("adding chunks to the vector index")?;
            // vector index already holds the batch; nothing is saved, so a re-ingest restores the pair
            if let Err(e) = self.lexical.add(&chunks).await {
                tracing::error!(backend = self.lexical.backend(), chunks = chunks.len(), error = %e, "Lexical add failed, indexes out of sync");
                return Err(e.context("lexical index out of sync with vector index"));
            }
        }
        self.vector.save(&self.index_dir).await?;
        self.lexical.save(&self.index_dir).await?;
        tracing::info!(files = files.len(), chunks = chunks.len(), "Ingestion complete");
        Ok(IngestReport { message: "Ingestion complete".to_string(), files_processed: files.len(), chunks_created: chunks.len() })
    }

    fn process_file(&self, path: &Path) -> Vec<Chunk> {
        if !self.extractor.supports(path) {
            tracing::warn!(file = %path.display(), "Unsupported file type, skipping");
            return vec![];
        }
        match self.extractor.extract(path) {
            Ok(blocks) => {
                let chunks = self.chunker.chunk(&blocks);
                tracing::info!(file = %path.display(), blocks = blocks.len(), chunks = chunks.len(), "Processed file");
                chunks
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Extraction failed, skipping");
                vec![]
            }
        }
    }
}
