use anyhow::{bail, Context, Result};
use arrow_array::{FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use eduassist_core::error::Error;
use eduassist_core::traits::Embedder;
use eduassist_core::{IndexedDocument, KnowledgeBase, MatchResult, MatchType};

use crate::cache::{self, CacheEntry};
use crate::schema::{build_documents_schema, vector_dim};
use crate::table::{ensure_table, open_db, sql_literal, string_column, table_exists};

/// One nearest-neighbour row.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
	pub id: String,
	pub subject: String,
	pub topic: String,
	pub answer: String,
	pub document: String,
	pub distance: f32,
	pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
	pub total_documents: usize,
	pub table: String,
	pub uri: String,
}

/// Cosine distance in `[0, 2]` mapped onto a `[0, 1]` similarity.
pub fn similarity_from_distance(distance: f32) -> f32 {
	1.0 - distance / 2.0
}

/// Turn the nearest hit into a lookup outcome. A hit exactly at the threshold
/// is accepted; a NaN similarity (zero query vector) never is.
pub fn classify(best: Option<&VectorHit>, threshold: f32) -> MatchResult {
	let Some(hit) = best else { return MatchResult::not_found().with_similarity(0.0) };
	if hit.similarity.is_nan() || hit.similarity < threshold {
		return MatchResult::not_found().with_similarity(hit.similarity);
	}
	MatchResult::found(hit.answer.clone(), MatchType::for_subject(&hit.subject)).with_similarity(hit.similarity)
}

/// Persistent semantic index over the knowledge base.
///
/// `structure` guards the documents table: searches and populates hold it
/// shared, `clear` holds it exclusively. Populates are additionally
/// serialised through `populate_lock`.
pub struct VectorIndex {
	conn: Connection,
	uri: String,
	table_name: String,
	cache_table: String,
	embedder: Arc<dyn Embedder>,
	structure: RwLock<()>,
	populate_lock: Mutex<()>,
}

impl VectorIndex {
	pub async fn open(uri: &str, table_name: &str, cache_table: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let conn = open_db(uri)
			.await
			.map_err(|e| Error::IndexUnavailable(format!("cannot open {uri}: {e}")))?;
		let dim = i32::try_from(embedder.dim())?;
		if table_exists(&conn, table_name).await? {
			let t = conn.open_table(table_name).execute().await?;
			let schema = t.schema().await?;
			let existing = vector_dim(&schema);
			if existing != Some(dim) {
				return Err(Error::IndexUnavailable(format!(
					"table {table_name} has vector width {existing:?}, embedder {} produces {dim}",
					embedder.id()
				))
				.into());
			}
		} else {
			ensure_table(&conn, table_name, build_documents_schema(dim)).await?;
		}
		info!(uri, table = table_name, embedder = embedder.id(), "vector index ready");
		Ok(Self {
			conn,
			uri: uri.to_string(),
			table_name: table_name.to_string(),
			cache_table: cache_table.to_string(),
			embedder,
			structure: RwLock::new(()),
			populate_lock: Mutex::new(()),
		})
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	async fn table(&self) -> Result<Table> {
		Ok(self.conn.open_table(&self.table_name).execute().await?)
	}

	async fn existing_ids(&self, table: &Table) -> Result<HashSet<String>> {
		let mut ids = HashSet::new();
		let mut stream = table.query().select(Select::columns(&["id"])).execute().await?;
		while let Some(batch) = stream.try_next().await? {
			let col = string_column(&batch, "id")?;
			for i in 0..batch.num_rows() {
				ids.insert(col.value(i).to_string());
			}
		}
		Ok(ids)
	}

	/// Index every record with a non-empty answer whose document is not
	/// already present. Returns the number of rows inserted.
	pub async fn populate(&self, kb: &KnowledgeBase) -> Result<usize> {
		let _shared = self.structure.read().await;
		let _serial = self.populate_lock.lock().await;

		let table = self.table().await?;
		let existing = self.existing_ids(&table).await?;
		let mut seen = HashSet::new();
		let docs: Vec<IndexedDocument> = kb
			.records()
			.filter(|r| r.is_indexable())
			.map(IndexedDocument::from_record)
			.filter(|d| !existing.contains(&d.id) && seen.insert(d.id.clone()))
			.collect();
		if docs.is_empty() {
			debug!(table = %self.table_name, "nothing to index");
			return Ok(0);
		}

		let vectors = self.vectors_for(&docs).await?;
		let batch = self.documents_batch(&docs, &vectors)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		let mut mi = table.merge_insert(&["id"]);
		mi.when_not_matched_insert_all();
		let res = mi.execute(reader).await?;
		let inserted = res.num_inserted_rows as usize;
		info!(table = %self.table_name, inserted, candidates = docs.len(), "populated vector index");
		Ok(inserted)
	}

	/// Startup variant of [`populate`](Self::populate): picks up topics merged
	/// into the knowledge base since the last run and logs failures instead of
	/// returning them, leaving whatever is already indexed searchable.
	pub async fn refresh(&self, kb: &KnowledgeBase) -> usize {
		match self.populate(kb).await {
			Ok(inserted) => inserted,
			Err(e) => {
				warn!(error = %e, table = %self.table_name, "vector index refresh failed");
				0
			}
		}
	}

	/// Vectors for `docs` in order, served from the embedding cache where
	/// possible. Cache failures only cost a re-embed.
	async fn vectors_for(&self, docs: &[IndexedDocument]) -> Result<Vec<Vec<f32>>> {
		let dim = self.embedder.dim();
		let eid = self.embedder.id().to_string();
		let hashes: Vec<String> = docs.iter().map(|d| cache::hash_content(&d.text)).collect();
		let mut cached = cache::get_many(&self.conn, &self.cache_table, &eid, dim, &hashes)
			.await
			.unwrap_or_else(|e| {
				warn!(error = %e, "embedding cache lookup failed");
				Default::default()
			});

		let misses: Vec<usize> = (0..docs.len()).filter(|&i| !cached.contains_key(&hashes[i])).collect();
		debug!(hits = docs.len() - misses.len(), misses = misses.len(), "embedding cache");
		if !misses.is_empty() {
			let texts: Vec<String> = misses.iter().map(|&i| docs[i].text.clone()).collect();
			let embedder = Arc::clone(&self.embedder);
			let fresh = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
				.await
				.context("embedding task panicked")??;
			if fresh.len() != misses.len() {
				bail!("embedder returned {} vectors for {} texts", fresh.len(), misses.len());
			}
			let mut entries = Vec::with_capacity(fresh.len());
			for (&i, v) in misses.iter().zip(fresh) {
				if v.len() != dim {
					bail!("embedder returned width {} (expected {dim})", v.len());
				}
				entries.push(CacheEntry { content_hash: hashes[i].clone(), embedder_id: eid.clone(), vector: v.clone() });
				cached.insert(hashes[i].clone(), v);
			}
			if let Err(e) = cache::put_many(&self.conn, &self.cache_table, dim, &entries).await {
				warn!(error = %e, "embedding cache write failed");
			}
		}

		hashes
			.iter()
			.map(|h| cached.get(h).cloned().ok_or_else(|| anyhow::anyhow!("no vector for {h}")))
			.collect()
	}

	fn documents_batch(&self, docs: &[IndexedDocument], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.embedder.dim())?;
		let schema = build_documents_schema(dim);
		let now = Utc::now().timestamp_millis();
		let eid = self.embedder.id();
		let vecs = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		Ok(RecordBatch::try_new(
			schema,
			vec![
				Arc::new(str_column(docs, |d| d.id.as_str())),
				Arc::new(str_column(docs, |d| d.subject_key.as_str())),
				Arc::new(str_column(docs, |d| d.topic_key.as_str())),
				Arc::new(str_column(docs, |d| d.keywords.as_str())),
				Arc::new(str_column(docs, |d| d.answer.as_str())),
				Arc::new(str_column(docs, |d| d.text.as_str())),
				Arc::new(StringArray::from(docs.iter().map(|d| cache::hash_content(&d.text)).collect::<Vec<_>>())),
				Arc::new(StringArray::from(vec![eid; docs.len()])),
				Arc::new(TimestampMillisecondArray::from(vec![now; docs.len()])),
				Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vecs, dim)),
			],
		)?)
	}

	/// Up to `k` nearest documents, closest first. Failures are logged and
	/// read as "no results".
	pub async fn search(&self, query: &str, k: usize, subject: Option<&str>) -> Vec<VectorHit> {
		match self.try_search(query, k, subject).await {
			Ok(hits) => hits,
			Err(e) => {
				warn!(error = %e, table = %self.table_name, "vector search failed");
				Vec::new()
			}
		}
	}

	pub async fn try_search(&self, query: &str, k: usize, subject: Option<&str>) -> Result<Vec<VectorHit>> {
		if query.trim().is_empty() || k == 0 {
			return Ok(Vec::new());
		}
		let _shared = self.structure.read().await;
		let table = self.table().await?;
		if table.count_rows(None).await? == 0 {
			return Ok(Vec::new());
		}

		let text = vec![query.to_string()];
		let embedder = Arc::clone(&self.embedder);
		let q = tokio::task::spawn_blocking(move || embedder.embed_batch(&text))
			.await
			.context("embedding task panicked")??
			.into_iter()
			.next()
			.ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))?;

		let mut vq = table.vector_search(q)?.distance_type(DistanceType::Cosine).limit(k);
		if let Some(s) = subject {
			vq = vq.only_if(format!("subject = {}", sql_literal(s)));
		}
		let mut stream = vq.execute().await?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			hits.extend(hits_from_batch(&batch)?);
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits.truncate(k);
		Ok(hits)
	}

	/// Nearest document's answer when it clears `threshold`.
	pub async fn best_answer(&self, query: &str, subject: Option<&str>, threshold: f32) -> MatchResult {
		let hits = self.search(query, 1, subject).await;
		let result = classify(hits.first(), threshold);
		debug!(match_type = %result.match_type, similarity = ?result.similarity, "vector best answer");
		result
	}

	/// Remove every document. The table stays in place and queryable.
	pub async fn clear(&self) -> Result<()> {
		let _exclusive = self.structure.write().await;
		if table_exists(&self.conn, &self.table_name).await? {
			self.table().await?.delete("true").await?;
		} else {
			let dim = i32::try_from(self.embedder.dim())?;
			ensure_table(&self.conn, &self.table_name, build_documents_schema(dim)).await?;
		}
		info!(table = %self.table_name, "vector index cleared");
		Ok(())
	}

	pub async fn stats(&self) -> Result<IndexStats> {
		let _shared = self.structure.read().await;
		let total_documents = self.table().await?.count_rows(None).await?;
		Ok(IndexStats { total_documents, table: self.table_name.clone(), uri: self.uri.clone() })
	}

	/// Wait for in-flight operations, then release the connection.
	pub async fn close(self) {
		let _exclusive = self.structure.write().await;
		debug!(table = %self.table_name, "vector index closed");
	}
}

fn str_column(docs: &[IndexedDocument], f: impl Fn(&IndexedDocument) -> &str) -> StringArray {
	StringArray::from(docs.iter().map(f).collect::<Vec<_>>())
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
	let id = string_column(batch, "id")?;
	let subject = string_column(batch, "subject")?;
	let topic = string_column(batch, "topic")?;
	let answer = string_column(batch, "answer")?;
	let document = string_column(batch, "document")?;
	let distance = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow::anyhow!("missing _distance column"))?;
	Ok((0..batch.num_rows())
		.map(|i| {
			let d = distance.value(i);
			VectorHit {
				id: id.value(i).to_string(),
				subject: subject.value(i).to_string(),
				topic: topic.value(i).to_string(),
				answer: answer.value(i).to_string(),
				document: document.value(i).to_string(),
				distance: d,
				similarity: similarity_from_distance(d),
			}
		})
		.collect())
}
