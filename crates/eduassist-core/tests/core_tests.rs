use std::fs;
use tempfile::TempDir;

use eduassist_core::config::{Config, Strategy};
use eduassist_core::error::Error;
use eduassist_core::knowledge::{self, KnowledgeBase, SharedKnowledge};
use eduassist_core::practice::generate_practice_questions;
use eduassist_core::subjects::subject_key_for;
use eduassist_core::{IndexedDocument, MatchType, TopicRecord};

const KB: &str = r#"{
  "general": {
    "greeting": { "keywords": ["hello", "hi"], "answer": "Hi there!" }
  },
  "python_programming": {
    "loops": { "keywords": ["loop", "for", "while"], "answer": "Loops repeat..." },
    "list_comprehension": { "keywords": ["comprehension"], "answer": "" },
    "broken": "not an object"
  },
  "orphan": 42
}"#;

#[test]
fn parses_records_in_file_order_and_skips_malformed_entries() {
    let kb = KnowledgeBase::from_json_str(KB).expect("parse");
    let keys: Vec<&str> = kb.subjects().iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, ["general", "python_programming"], "non-object subjects are skipped");

    let python = kb.subject("python_programming").expect("subject");
    let topics: Vec<&str> = python.topics.iter().map(|t| t.topic_key.as_str()).collect();
    assert_eq!(topics, ["loops", "list_comprehension"], "non-object topics are skipped, order kept");
    assert_eq!(kb.topic_count(), 3);
    assert_eq!(python.topics[0].keywords, ["loop", "for", "while"]);
}

#[test]
fn missing_fields_default_to_empty() {
    let kb = KnowledgeBase::from_json_str(r#"{"dbms": {"joins": {}}}"#).expect("parse");
    let rec = &kb.subject("dbms").expect("subject").topics[0];
    assert!(rec.keywords.is_empty());
    assert!(!rec.is_indexable());
}

#[test]
fn load_folds_missing_file_into_empty_base() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("absent.json");
    assert!(matches!(knowledge::try_load(&path), Err(Error::NotFound(_))));
    assert!(knowledge::load(&path).is_empty());
}

#[test]
fn load_folds_malformed_json_into_empty_base() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(knowledge::try_load(&path), Err(Error::Parse(_))));
    assert!(knowledge::load(&path).is_empty());

    fs::write(&path, "[1, 2, 3]").unwrap();
    assert!(matches!(knowledge::try_load(&path), Err(Error::Parse(_))), "root must be an object");
}

#[test]
fn shared_knowledge_only_changes_on_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kb.json");
    fs::write(&path, r#"{"dbms": {"joins": {"keywords": ["join"], "answer": "Joins combine rows."}}}"#).unwrap();
    let shared = SharedKnowledge::open(&path);
    assert_eq!(shared.snapshot().topic_count(), 1);

    fs::write(&path, KB).unwrap();
    assert_eq!(shared.snapshot().topic_count(), 1, "cached until an explicit reload");
    assert_eq!(shared.reload().topic_count(), 3);
    assert_eq!(shared.snapshot().topic_count(), 3);
}

#[test]
fn indexed_document_text_and_identity() {
    let rec = TopicRecord {
        subject_key: "python_programming".into(),
        topic_key: "list_comprehension".into(),
        keywords: vec!["list".into(), "comprehension".into()],
        answer: "Compact list building.".into(),
    };
    let doc = IndexedDocument::from_record(&rec);
    assert_eq!(doc.id, "python_programming_list_comprehension");
    assert_eq!(doc.text, "Topic: List Comprehension\nKeywords: list, comprehension\n\nCompact list building.");
    assert_eq!(MatchType::for_subject("general"), MatchType::General);
    assert_eq!(MatchType::for_subject("dbms"), MatchType::Subject);
    assert_eq!(MatchType::NotFound.to_string(), "not_found");
}

#[test]
fn titles_capitalise_after_every_non_letter() {
    let title = |key: &str| TopicRecord { subject_key: "dbms".into(), topic_key: key.into(), keywords: vec![], answer: String::new() }.title();
    assert_eq!(title("1nf_basics"), "1Nf Basics");
    assert_eq!(title("acid__properties"), "Acid  Properties");
    assert_eq!(title("SQL_joins"), "Sql Joins");
    assert_eq!(title("b2b_sync"), "B2B Sync");
}

#[test]
fn practice_questions_lookup_and_fallbacks() {
    let loops = generate_practice_questions("python_programming", "loops");
    assert_eq!(loops[0], "What is the difference between for and while loops?");
    assert_eq!(loops.len(), 5);

    let unknown_topic = generate_practice_questions("dbms", "transactions");
    assert_eq!(unknown_topic, generate_practice_questions("dbms", "default"));

    assert_eq!(
        generate_practice_questions("astrophysics", "default"),
        vec!["Practice questions for this subject coming soon!".to_string()]
    );
}

#[test]
fn subject_names_map_to_keys() {
    assert_eq!(subject_key_for("Database Management Systems"), "dbms");
    assert_eq!(subject_key_for("C Programming"), "c_programming");
    assert_eq!(subject_key_for("Underwater Basket Weaving"), "python_programming");
}

#[test]
fn config_merges_file_env_and_defaults() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[vector]\nsimilarity_threshold = 0.6\n[resolver]\nstrategy = \"keyword\"\n")?;
        jail.create_file("config.test.toml", "[knowledge]\npath = \"fixtures/kb.json\"\n")?;
        jail.set_env("APP_VECTOR__SEARCH_K", "7");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        let cache_table: String = config.get("vector.cache_table").map_err(|e| e.to_string())?;
        assert_eq!(cache_table, "embedding_cache");
        assert!((settings.vector.similarity_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(settings.vector.search_k, 7);
        assert_eq!(settings.vector.table, "knowledge_base");
        assert_eq!(settings.resolver.strategy, Strategy::Keyword);
        assert_eq!(settings.resolver.default_subject, "python_programming");
        assert_eq!(settings.knowledge.path, "fixtures/kb.json");
        Ok(())
    });
}

#[test]
fn config_rejects_out_of_range_threshold() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[vector]\nsimilarity_threshold = 1.5\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}
