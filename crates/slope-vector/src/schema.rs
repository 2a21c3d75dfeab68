use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const TABLE_NAME: &str = "chunks";
pub const STORE_DIR: &str = "vector_store";

/// Row layout of the persisted vector table; `position` is the row's index in
/// the in-memory vector list.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("doc_id", DataType::Utf8, false),
		Field::new("page", DataType::Int32, false),
		Field::new("section_path", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("is_table", DataType::Boolean, false),
		Field::new("metadata", DataType::Utf8, false),
		Field::new("position", DataType::Int64, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
