use std::sync::Arc;

use eduassist_core::knowledge::{KnowledgeBase, SharedKnowledge};
use eduassist_core::{MatchResult, MatchType, TopicRecord, GENERAL_SUBJECT};

/// Number of `record`'s keywords found as substrings of the already
/// lowercased `query`. Empty keywords never count.
pub fn keyword_hits(record: &TopicRecord, query: &str) -> usize {
    record
        .keywords
        .iter()
        .filter(|k| !k.is_empty() && query.contains(k.to_lowercase().as_str()))
        .count()
}

/// First topic of the `general` subject, in stored order, with an answer and
/// any keyword contained in `query`.
pub fn general_hit<'a>(kb: &'a KnowledgeBase, query: &str) -> Option<&'a TopicRecord> {
    kb.subject(GENERAL_SUBJECT)?
        .topics
        .iter()
        .find(|t| t.is_indexable() && keyword_hits(t, query) > 0)
}

/// Every topic of `subject_key` with at least one hit, most hits first.
/// Equal counts keep stored order, so the head is the first-seen maximum.
pub fn ranked_subject_hits<'a>(kb: &'a KnowledgeBase, subject_key: &str, query: &str) -> Vec<(&'a TopicRecord, usize)> {
    let Some(subject) = kb.subject(subject_key) else { return Vec::new() };
    let mut hits: Vec<(&TopicRecord, usize)> = subject
        .topics
        .iter()
        .map(|t| (t, keyword_hits(t, query)))
        .filter(|(_, n)| *n > 0)
        .collect();
    hits.sort_by(|a, b| b.1.cmp(&a.1));
    hits
}

/// Topic of `subject_key` with the strictly highest hit count; ties keep the
/// first one seen.
pub fn best_subject_hit<'a>(kb: &'a KnowledgeBase, subject_key: &str, query: &str) -> Option<(&'a TopicRecord, usize)> {
    let subject = kb.subject(subject_key)?;
    let mut best: Option<(&TopicRecord, usize)> = None;
    for topic in &subject.topics {
        let n = keyword_hits(topic, query);
        if n > best.map_or(0, |(_, m)| m) {
            best = Some((topic, n));
        }
    }
    best
}

/// Substring keyword scoring over the shared knowledge base. Each call reads
/// the current snapshot, so a reload is picked up without rebuilding anything.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    knowledge: Arc<SharedKnowledge>,
}

impl KeywordMatcher {
    pub fn new(knowledge: Arc<SharedKnowledge>) -> Self {
        Self { knowledge }
    }

    pub fn knowledge(&self) -> &Arc<SharedKnowledge> {
        &self.knowledge
    }

    /// The general-subject override on its own.
    pub fn match_general(&self, query: &str) -> Option<MatchResult> {
        let kb = self.knowledge.snapshot();
        let query = query.to_lowercase();
        general_hit(&kb, &query).map(|t| MatchResult::found(t.answer.clone(), MatchType::General))
    }

    /// General override first, then the best-scoring topic of `subject_key`.
    pub fn find_answer(&self, query: &str, subject_key: &str) -> MatchResult {
        let kb = self.knowledge.snapshot();
        let query = query.to_lowercase();
        if let Some(topic) = general_hit(&kb, &query) {
            tracing::debug!(topic = %topic.topic_key, "general keyword override");
            return MatchResult::found(topic.answer.clone(), MatchType::General);
        }
        match best_subject_hit(&kb, subject_key, &query) {
            Some((topic, hits)) => {
                tracing::debug!(subject = %subject_key, topic = %topic.topic_key, hits, "keyword match");
                MatchResult::found(topic.answer.clone(), MatchType::Subject)
            }
            None => MatchResult::not_found(),
        }
    }
}
