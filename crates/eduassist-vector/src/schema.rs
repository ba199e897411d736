use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

fn vector_field(dim: i32) -> Field {
	Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

/// One row per indexed topic. `id` is `<subject>_<topic>`.
pub fn build_documents_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("subject", DataType::Utf8, false),
		Field::new("topic", DataType::Utf8, false),
		Field::new("keywords", DataType::Utf8, false),
		Field::new("answer", DataType::Utf8, false),
		Field::new("document", DataType::Utf8, false),
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("embedder_id", DataType::Utf8, false),
		Field::new("indexed_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
		vector_field(dim),
	]))
}

/// Embedding cache keyed by `(content_hash, embedder_id)`.
pub fn build_cache_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("embedder_id", DataType::Utf8, false),
		Field::new("created_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
		vector_field(dim),
	]))
}

/// Width of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name("vector").ok()?.data_type() {
		DataType::FixedSizeList(_, n) => Some(*n),
		_ => None,
	}
}
