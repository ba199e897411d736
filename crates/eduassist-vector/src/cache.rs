//! Lance-backed embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! The cache is consulted before calling the embedder and written through on
//! misses, so clearing and repopulating the index does not re-embed content
//! that has not changed.

use anyhow::Result;
use arrow_array::cast::AsArray;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::schema::build_cache_schema;
use crate::table::{ensure_table, sql_literal, string_column, table_exists};

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

pub fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

pub async fn get_many(
    conn: &Connection,
    table: &str,
    embedder_id: &str,
    dim: usize,
    hashes: &[String],
) -> Result<HashMap<String, Vec<f32>>> {
    if hashes.is_empty() || !table_exists(conn, table).await? { return Ok(HashMap::new()); }
    let wanted: HashSet<&str> = hashes.iter().map(String::as_str).collect();
    let t = conn.open_table(table).execute().await?;
    let mut out = HashMap::new();
    let mut stream = t
        .query()
        .only_if(format!("embedder_id = {}", sql_literal(embedder_id)))
        .execute()
        .await?;
    while let Some(batch) = stream.try_next().await? {
        let hash_col = string_column(&batch, "content_hash")?;
        let vec_col = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| anyhow::anyhow!("missing vector column"))?;
        for i in 0..batch.num_rows() {
            let h = hash_col.value(i);
            if !wanted.contains(h) { continue; }
            let vals = vec_col
                .value(i)
                .as_primitive::<arrow_array::types::Float32Type>()
                .values()
                .to_vec();
            if vals.len() == dim { out.insert(h.to_string(), vals); }
        }
    }
    Ok(out)
}

pub async fn put_many(conn: &Connection, table: &str, dim: usize, entries: &[CacheEntry]) -> Result<()> {
    if entries.is_empty() { return Ok(()); }
    let schema = build_cache_schema(i32::try_from(dim)?);
    ensure_table(conn, table, schema.clone()).await?;
    let t = conn.open_table(table).execute().await?;
    let now = Utc::now().timestamp_millis();
    let mut hashes = Vec::with_capacity(entries.len());
    let mut eids = Vec::with_capacity(entries.len());
    let mut created = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for e in entries {
        hashes.push(e.content_hash.clone());
        eids.push(e.embedder_id.clone());
        created.push(now);
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(hashes)),
            Arc::new(StringArray::from(eids)),
            Arc::new(TimestampMillisecondArray::from(created)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, i32::try_from(dim)?)),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    // Two writers may race on the same content; keep whichever landed first.
    let mut mi = t.merge_insert(&["content_hash", "embedder_id"]);
    mi.when_not_matched_insert_all();
    mi.execute(reader).await?;
    Ok(())
}
