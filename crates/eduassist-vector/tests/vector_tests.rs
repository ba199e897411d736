use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

use eduassist_core::traits::{AnswerSource, Embedder};
use eduassist_core::{IndexedDocument, KnowledgeBase, MatchType, SourceKind};
use eduassist_embed::FakeEmbedder;
use eduassist_vector::{cache, VectorIndex, VectorSource};

const DIM: usize = 64;

const KB: &str = r#"{
  "general": {
    "greeting": { "keywords": ["hello", "hi"], "answer": "Hi there! Ask me about your course." }
  },
  "python_programming": {
    "loops": { "keywords": ["loop", "for", "while"], "answer": "Loops repeat a block of code." },
    "variables": { "keywords": ["variable", "assign"], "answer": "Variables name values." },
    "draft": { "keywords": ["draft"], "answer": "" }
  },
  "dbms": {
    "joins": { "keywords": ["join", "inner"], "answer": "Joins combine rows from two tables." }
  }
}"#;

fn kb() -> KnowledgeBase {
    KnowledgeBase::from_json_str(KB).expect("parse")
}

fn document_text(kb: &KnowledgeBase, subject: &str, topic: &str) -> String {
    let record = kb
        .records()
        .find(|r| r.subject_key == subject && r.topic_key == topic)
        .expect("record");
    IndexedDocument::from_record(record).text
}

async fn open(tmp: &TempDir) -> VectorIndex {
    let uri = tmp.path().to_string_lossy().to_string();
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(DIM));
    VectorIndex::open(&uri, "knowledge_base", "embedding_cache", embedder).await.expect("open")
}

#[tokio::test]
async fn populate_is_idempotent_and_skips_empty_answers() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    let kb = kb();

    assert_eq!(index.populate(&kb).await.expect("populate"), 4);
    assert_eq!(index.populate(&kb).await.expect("populate again"), 0);
    assert_eq!(index.stats().await.expect("stats").total_documents, 4);

    let hits = index.search(&document_text(&kb, "python_programming", "variables"), 10, None).await;
    assert!(hits.iter().all(|h| h.id != "python_programming_draft"));
}

#[tokio::test]
async fn exact_document_text_is_nearest_with_full_similarity() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    let kb = kb();
    index.populate(&kb).await.unwrap();

    let query = document_text(&kb, "python_programming", "loops");
    let hits = index.search(&query, 3, None).await;
    assert_eq!(hits[0].id, "python_programming_loops");
    assert!(hits[0].similarity > 0.99, "similarity {}", hits[0].similarity);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let r = index.best_answer(&query, Some("python_programming"), 0.5).await;
    assert_eq!(r.match_type, MatchType::Subject);
    assert_eq!(r.answer, "Loops repeat a block of code.");
}

#[tokio::test]
async fn subject_filter_restricts_results() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    let kb = kb();
    index.populate(&kb).await.unwrap();

    let query = document_text(&kb, "python_programming", "loops");
    let hits = index.search(&query, 5, Some("dbms")).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].subject, "dbms");

    assert!(index.search(&query, 5, Some("no_such_subject")).await.is_empty());
}

#[tokio::test]
async fn general_documents_are_reported_as_general() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    let kb = kb();
    index.populate(&kb).await.unwrap();

    let r = index.best_answer(&document_text(&kb, "general", "greeting"), None, 0.5).await;
    assert_eq!(r.match_type, MatchType::General);
    assert_eq!(r.answer, "Hi there! Ask me about your course.");
}

#[tokio::test]
async fn empty_index_and_empty_query_yield_nothing() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    assert!(index.search("what is a loop", 3, None).await.is_empty());

    let r = index.best_answer("what is a loop", None, 0.5).await;
    assert_eq!(r.match_type, MatchType::NotFound);
    assert_eq!(r.similarity, Some(0.0));

    index.populate(&kb()).await.unwrap();
    assert!(index.search("   ", 3, None).await.is_empty());
}

#[tokio::test]
async fn clear_empties_but_keeps_table_usable() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    let kb = kb();
    index.populate(&kb).await.unwrap();

    index.clear().await.expect("clear");
    assert_eq!(index.stats().await.unwrap().total_documents, 0);
    let query = document_text(&kb, "dbms", "joins");
    assert!(index.search(&query, 3, None).await.is_empty());

    assert_eq!(index.populate(&kb).await.unwrap(), 4);
    assert_eq!(index.search(&query, 1, None).await[0].id, "dbms_joins");
}

#[tokio::test]
async fn populate_writes_through_the_embedding_cache() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().to_string_lossy().to_string();
    let index = open(&tmp).await;
    let kb = kb();
    index.populate(&kb).await.unwrap();

    let hashes: Vec<String> = kb
        .records()
        .filter(|r| r.is_indexable())
        .map(|r| cache::hash_content(&IndexedDocument::from_record(r).text))
        .collect();
    let conn = eduassist_vector::table::open_db(&uri).await.unwrap();
    let embedder = FakeEmbedder::new(DIM);
    let cached = cache::get_many(&conn, "embedding_cache", embedder.id(), DIM, &hashes).await.unwrap();
    assert_eq!(cached.len(), 4);

    let other = cache::get_many(&conn, "embedding_cache", "other-model", DIM, &hashes).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn reopening_with_a_different_width_fails() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().to_string_lossy().to_string();
    let index = open(&tmp).await;
    index.close().await;

    let narrow: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(DIM / 2));
    let err = VectorIndex::open(&uri, "knowledge_base", "embedding_cache", narrow).await.err().expect("width mismatch");
    assert!(err.to_string().contains("Index unavailable"), "{err}");
}

#[tokio::test]
async fn vector_source_yields_single_candidate_above_threshold() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(open(&tmp).await);
    let kb = kb();
    index.populate(&kb).await.unwrap();
    let query = document_text(&kb, "dbms", "joins");

    let source = VectorSource::new(Arc::clone(&index), 0.5);
    let candidates = source.search(&query, "dbms").await.expect("search");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].topic_key, "joins");
    assert_eq!(candidates[0].source, SourceKind::Vector);

    let strict = VectorSource::new(index, 2.0);
    assert!(strict.search(&query, "dbms").await.expect("search").is_empty());
}

#[tokio::test]
async fn vector_source_with_k_ranks_nearest_first() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(open(&tmp).await);
    let kb = kb();
    index.populate(&kb).await.unwrap();

    let source = VectorSource::new(index, 0.0).with_k(5);
    let candidates = source.search(&document_text(&kb, "python_programming", "loops"), "python_programming").await.unwrap();
    let topics: Vec<&str> = candidates.iter().map(|c| c.topic_key.as_str()).collect();
    assert_eq!(topics, ["loops", "variables"]);
    assert!(candidates[0].score >= candidates[1].score);
}

#[tokio::test]
async fn refresh_indexes_topics_merged_in_later() {
    let tmp = TempDir::new().unwrap();
    let index = open(&tmp).await;
    assert_eq!(index.refresh(&kb()).await, 4);

    let grown = KB.replacen(
        r#""joins": {"#,
        r#""indexes": { "keywords": ["index"], "answer": "Indexes speed up lookups." },
    "joins": {"#,
        1,
    );
    let grown = KnowledgeBase::from_json_str(&grown).unwrap();
    assert_eq!(index.refresh(&grown).await, 1);
    assert_eq!(index.stats().await.unwrap().total_documents, 5);

    let r = index.best_answer(&document_text(&grown, "dbms", "indexes"), Some("dbms"), 0.5).await;
    assert_eq!(r.answer, "Indexes speed up lookups.");
}

struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn id(&self) -> &str {
        "broken"
    }
    fn dim(&self) -> usize {
        DIM
    }
    fn max_len(&self) -> usize {
        16
    }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model weights missing")
    }
}

#[tokio::test]
async fn refresh_absorbs_embedder_failures() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().to_string_lossy().to_string();
    let index = VectorIndex::open(&uri, "knowledge_base", "embedding_cache", Arc::new(BrokenEmbedder)).await.unwrap();

    assert!(index.populate(&kb()).await.is_err());
    assert_eq!(index.refresh(&kb()).await, 0);
    assert_eq!(index.stats().await.unwrap().total_documents, 0);
    assert!(index.search("what is a loop", 3, None).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_populate_search_and_clear_never_duplicate() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(open(&tmp).await);
    let kb = Arc::new(kb());
    let query = document_text(&kb, "dbms", "joins");

    let mut tasks = Vec::new();
    for i in 0..8 {
        let index = Arc::clone(&index);
        let kb = Arc::clone(&kb);
        let query = query.clone();
        tasks.push(tokio::spawn(async move {
            match i % 4 {
                0 | 2 => index.populate(&kb).await.map(|_| ()),
                1 => index.try_search(&query, 10, None).await.map(|_| ()),
                _ => index.clear().await,
            }
        }));
    }
    for task in tasks {
        task.await.expect("task panicked").expect("operation failed");
    }

    index.populate(&kb).await.expect("final populate");
    assert_eq!(index.stats().await.unwrap().total_documents, 4);
    let hits = index.try_search(&query, 10, None).await.unwrap();
    let ids: HashSet<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(hits.len(), 4);
    assert_eq!(ids.len(), 4, "duplicate ids in {hits:?}");
}
