//! Knowledge store: the persisted `subject -> topic -> {keywords, answer}` tree.
//!
//! Loading is soft by default: a missing or malformed file yields an empty
//! knowledge base and a warning, never a failure for the caller. Iteration
//! order follows the file, which the keyword matcher relies on for its
//! first-wins rules.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::types::TopicRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub key: String,
    pub topics: Vec<TopicRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    subjects: Vec<Subject>,
}

#[derive(Deserialize)]
struct RawTopic {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    answer: String,
}

impl KnowledgeBase {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// Parse the JSON form. Entries that are not objects are skipped; only a
    /// top-level document that is not an object is an error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))?;
        let serde_json::Value::Object(root) = root else {
            return Err(Error::Parse("knowledge base root must be an object".to_string()));
        };
        let mut subjects = Vec::with_capacity(root.len());
        for (subject_key, topics) in root {
            let serde_json::Value::Object(topics) = topics else {
                tracing::debug!(subject = %subject_key, "skipping non-object subject entry");
                continue;
            };
            let mut records = Vec::with_capacity(topics.len());
            for (topic_key, data) in topics {
                match serde_json::from_value::<RawTopic>(data) {
                    Ok(raw) => records.push(TopicRecord { subject_key: subject_key.clone(), topic_key, keywords: raw.keywords, answer: raw.answer }),
                    Err(e) => tracing::debug!(subject = %subject_key, topic = %topic_key, "skipping malformed topic: {}", e),
                }
            }
            subjects.push(Subject { key: subject_key, topics: records });
        }
        Ok(Self { subjects })
    }

    pub fn subject(&self, key: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.key == key)
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// All records across all subjects, in stored order.
    pub fn records(&self) -> impl Iterator<Item = &TopicRecord> {
        self.subjects.iter().flat_map(|s| s.topics.iter())
    }

    pub fn topic_count(&self) -> usize {
        self.subjects.iter().map(|s| s.topics.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.topic_count() == 0
    }
}

/// Strict load: reports why the knowledge base could not be read.
pub fn try_load(path: &Path) -> Result<KnowledgeBase> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound(path.display().to_string())),
        Err(e) => return Err(Error::Operation(format!("reading {}: {}", path.display(), e))),
    };
    KnowledgeBase::from_json_str(&content).map_err(|e| match e {
        Error::Parse(msg) => Error::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Soft load: any failure is logged and folded into an empty knowledge base.
pub fn load(path: &Path) -> KnowledgeBase {
    match try_load(path) {
        Ok(kb) => {
            tracing::info!(path = %path.display(), subjects = kb.subjects().len(), topics = kb.topic_count(), "knowledge base loaded");
            kb
        }
        Err(e) => {
            tracing::warn!("knowledge base unavailable, continuing with no answers: {}", e);
            KnowledgeBase::default()
        }
    }
}

/// Process-wide cached knowledge base. Readers take cheap snapshots; the
/// backing file is only re-read on an explicit [`SharedKnowledge::reload`].
#[derive(Debug)]
pub struct SharedKnowledge {
    path: Option<PathBuf>,
    current: RwLock<Arc<KnowledgeBase>>,
}

impl SharedKnowledge {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kb = load(&path);
        Self { path: Some(path), current: RwLock::new(Arc::new(kb)) }
    }

    /// In-memory handle with no backing file; `reload` keeps the current value.
    pub fn from_base(kb: KnowledgeBase) -> Self {
        Self { path: None, current: RwLock::new(Arc::new(kb)) }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-read the backing file and swap it in. Returns the new snapshot.
    pub fn reload(&self) -> Arc<KnowledgeBase> {
        let Some(path) = &self.path else { return self.snapshot() };
        let fresh = Arc::new(load(path));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        fresh
    }
}
