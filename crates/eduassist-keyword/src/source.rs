use async_trait::async_trait;

use eduassist_core::traits::AnswerSource;
use eduassist_core::{Candidate, MatchType, SourceKind};

use crate::matcher::{ranked_subject_hits, KeywordMatcher};

/// Subject-scoped keyword scoring as an [`AnswerSource`]. The general
/// override is not applied here; the resolver runs it before any source.
pub struct KeywordSource {
    matcher: KeywordMatcher,
}

impl KeywordSource {
    pub fn new(matcher: KeywordMatcher) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl AnswerSource for KeywordSource {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn search(&self, query: &str, subject_key: &str) -> anyhow::Result<Vec<Candidate>> {
        let kb = self.matcher.knowledge().snapshot();
        let query = query.to_lowercase();
        Ok(ranked_subject_hits(&kb, subject_key, &query)
            .into_iter()
            .map(|(topic, hits)| Candidate {
                subject_key: topic.subject_key.clone(),
                topic_key: topic.topic_key.clone(),
                answer: topic.answer.clone(),
                match_type: MatchType::Subject,
                score: hits as f32,
                source: SourceKind::Keyword,
            })
            .collect())
    }
}
