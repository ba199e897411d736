//! Domain types shared by the keyword matcher, the vector index and the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type SubjectKey = String;
pub type TopicKey = String;

/// Reserved subject whose topics preempt every subject-scoped lookup.
pub const GENERAL_SUBJECT: &str = "general";

/// Subject used when the caller has not selected one, and as the last-resort
/// fallback scope of the resolver.
pub const DEFAULT_SUBJECT: &str = "python_programming";

/// The atomic unit of knowledge.
///
/// - `subject_key`/`topic_key`: identity, already case-normalised by content tooling
/// - `keywords`: lowercase match terms, order kept for display only
/// - `answer`: canonical response body; empty answers are never indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub subject_key: SubjectKey,
    pub topic_key: TopicKey,
    pub keywords: Vec<String>,
    pub answer: String,
}

impl TopicRecord {
    /// Stable identity of the record's indexed document.
    pub fn document_id(&self) -> String {
        format!("{}_{}", self.subject_key, self.topic_key)
    }

    pub fn is_indexable(&self) -> bool {
        !self.answer.is_empty()
    }

    /// Human title derived from the topic key, e.g. `list_comprehension` -> `List Comprehension`.
    ///
    /// Underscores become spaces one for one. A letter is upper-cased when the
    /// character before it is not a letter and lower-cased otherwise, so
    /// `1nf_basics` -> `1Nf Basics`.
    pub fn title(&self) -> String {
        let mut out = String::with_capacity(self.topic_key.len());
        let mut after_letter = false;
        for c in self.topic_key.chars() {
            let c = if c == '_' { ' ' } else { c };
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = c.is_lowercase() || c.is_uppercase();
        }
        out
    }
}

/// Derived artifact stored in the vector index, one per indexable [`TopicRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub subject_key: SubjectKey,
    pub topic_key: TopicKey,
    pub keywords: String,
    pub answer: String,
    pub text: String,
}

impl IndexedDocument {
    pub fn from_record(record: &TopicRecord) -> Self {
        let keywords = record.keywords.join(", ");
        let text = format!("Topic: {}\nKeywords: {}\n\n{}", record.title(), keywords, record.answer);
        Self {
            id: record.document_id(),
            subject_key: record.subject_key.clone(),
            topic_key: record.topic_key.clone(),
            keywords,
            answer: record.answer.clone(),
            text,
        }
    }
}

/// How an answer was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    General,
    Subject,
    NotFound,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::General => "general",
            MatchType::Subject => "subject",
            MatchType::NotFound => "not_found",
        }
    }

    /// Classification of a hit by the subject of the document it came from.
    pub fn for_subject(subject_key: &str) -> Self {
        if subject_key == GENERAL_SUBJECT { MatchType::General } else { MatchType::Subject }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single lookup. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub answer: String,
    pub match_type: MatchType,
    pub similarity: Option<f32>,
}

impl MatchResult {
    pub fn found(answer: impl Into<String>, match_type: MatchType) -> Self {
        Self { answer: answer.into(), match_type, similarity: None }
    }

    pub fn not_found() -> Self {
        Self { answer: String::new(), match_type: MatchType::NotFound, similarity: None }
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn is_found(&self) -> bool {
        self.match_type != MatchType::NotFound && !self.answer.is_empty()
    }
}

/// A single answer proposed by an [`crate::traits::AnswerSource`].
///
/// `score` is source-specific (keyword hit count, cosine similarity) but
/// higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub subject_key: SubjectKey,
    pub topic_key: TopicKey,
    pub answer: String,
    pub match_type: MatchType,
    pub score: f32,
    pub source: SourceKind,
}

/// Indicates which strategy produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Keyword,
}
