//! LanceDB persistence for the vector index.
//!
//! One table, rewritten wholesale on every save. The new table is written to
//! a staging directory next to the store and renamed into place, so a failed
//! save leaves the previous store untouched. Rows carry their position so
//! load can restore the exact vector order the flat index searched over.
use anyhow::{anyhow, Result};
use arrow_array::{
	Array, BooleanArray, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;

use slope_core::types::{Chunk, Meta};

use crate::schema::{build_arrow_schema, STORE_DIR, TABLE_NAME};

const BATCH_ROWS: usize = 1000;

async fn open_db(dir: &Path) -> Result<Connection> {
	Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

/// Replace whatever is stored under `<dir>/vector_store` with `rows`.
pub async fn write_rows(dir: &Path, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
	if chunks.len() != vectors.len() {
		return Err(anyhow!("{} chunks but {} vectors", chunks.len(), vectors.len()));
	}
	let store = dir.join(STORE_DIR);
	if chunks.is_empty() {
		if store.exists() {
			std::fs::remove_dir_all(&store)?;
		}
		return Ok(());
	}
	let dim = vectors[0].len();
	if vectors.iter().any(|v| v.len() != dim) {
		return Err(anyhow!("vectors have mixed dimensions"));
	}

	let staging = dir.join(format!("{}.staging", STORE_DIR));
	if staging.exists() {
		std::fs::remove_dir_all(&staging)?;
	}
	std::fs::create_dir_all(&staging)?;
	if let Err(e) = write_table(&staging, chunks, vectors, dim).await {
		if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
			tracing::warn!(path = %staging.display(), error = %cleanup, "Could not remove staging store");
		}
		return Err(e);
	}
	replace_dir(&staging, &store)
}

/// Move `staging` to `store`, keeping the old store until the rename succeeds.
fn replace_dir(staging: &Path, store: &Path) -> Result<()> {
	let previous = store.with_extension("previous");
	if previous.exists() {
		std::fs::remove_dir_all(&previous)?;
	}
	let had_store = store.exists();
	if had_store {
		std::fs::rename(store, &previous)?;
	}
	if let Err(e) = std::fs::rename(staging, store) {
		if had_store {
			std::fs::rename(&previous, store)?;
		}
		return Err(e.into());
	}
	if had_store {
		std::fs::remove_dir_all(&previous)?;
	}
	Ok(())
}

async fn write_table(store: &Path, chunks: &[Chunk], vectors: &[Vec<f32>], dim: usize) -> Result<()> {
	let db = open_db(store).await?;
	let mut created = false;
	for (batch_idx, (cs, vs)) in chunks.chunks(BATCH_ROWS).zip(vectors.chunks(BATCH_ROWS)).enumerate() {
		let rb = to_record_batch(cs, vs, batch_idx * BATCH_ROWS, dim as i32)?;
		let schema = rb.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
		if created {
			db.open_table(TABLE_NAME).execute().await?.add(reader).execute().await?;
		} else {
			db.create_table(TABLE_NAME, reader).execute().await?;
			created = true;
		}
	}
	Ok(())
}

fn to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>], offset: usize, dim: i32) -> Result<RecordBatch> {
	let mut metadata = Vec::with_capacity(chunks.len());
	for c in chunks {
		metadata.push(serde_json::to_string(&c.metadata)?);
	}
	let vectors: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
	let rb = RecordBatch::try_new(build_arrow_schema(dim), vec![
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.doc_id.as_str()))),
		Arc::new(Int32Array::from_iter_values(chunks.iter().map(|c| c.page as i32))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.section_path.as_str()))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
		Arc::new(BooleanArray::from(chunks.iter().map(|c| c.is_table).collect::<Vec<bool>>())),
		Arc::new(StringArray::from(metadata)),
		Arc::new(Int64Array::from_iter_values((offset..offset + chunks.len()).map(|p| p as i64))),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
	])?;
	Ok(rb)
}

/// Read back every stored row ordered by position; `None` when nothing is stored.
pub async fn read_rows(dir: &Path) -> Result<Option<(Vec<Chunk>, Vec<Vec<f32>>)>> {
	let store = dir.join(STORE_DIR);
	if !store.exists() {
		return Ok(None);
	}
	let db = open_db(&store).await?;
	if !db.table_names().execute().await?.contains(&TABLE_NAME.to_string()) {
		return Ok(None);
	}
	let table = db.open_table(TABLE_NAME).execute().await?;
	let total = table.count_rows(None).await?;
	let mut rows: Vec<(i64, Chunk, Vec<f32>)> = Vec::with_capacity(total);
	if total > 0 {
		let mut stream = table.query().limit(total).execute().await?;
		while let Some(batch) = stream.try_next().await? {
			read_batch(&batch, &mut rows)?;
		}
	}
	rows.sort_by_key(|(pos, _, _)| *pos);
	let (chunks, vectors) = rows.into_iter().map(|(_, c, v)| (c, v)).unzip();
	Ok(Some((chunks, vectors)))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("vector table column '{}' missing or mistyped", name))
}

fn read_batch(batch: &RecordBatch, rows: &mut Vec<(i64, Chunk, Vec<f32>)>) -> Result<()> {
	let ids = column::<StringArray>(batch, "id")?;
	let doc_ids = column::<StringArray>(batch, "doc_id")?;
	let pages = column::<Int32Array>(batch, "page")?;
	let sections = column::<StringArray>(batch, "section_path")?;
	let texts = column::<StringArray>(batch, "text")?;
	let tables = column::<BooleanArray>(batch, "is_table")?;
	let metas = column::<StringArray>(batch, "metadata")?;
	let positions = column::<Int64Array>(batch, "position")?;
	let vectors = column::<FixedSizeListArray>(batch, "vector")?;
	for i in 0..batch.num_rows() {
		let values = vectors.value(i);
		let floats = values
			.as_any()
			.downcast_ref::<Float32Array>()
			.ok_or_else(|| anyhow!("vector column is not float32"))?;
		let metadata: Meta = serde_json::from_str(metas.value(i))?;
		let chunk = Chunk {
			id: ids.value(i).to_string(),
			doc_id: doc_ids.value(i).to_string(),
			page: pages.value(i).max(0) as u32,
			section_path: sections.value(i).to_string(),
			text: texts.value(i).to_string(),
			is_table: tables.value(i),
			metadata,
		};
		rows.push((positions.value(i), chunk, floats.values().to_vec()));
	}
	Ok(())
}
