use async_trait::async_trait;
use std::sync::Arc;

use eduassist_core::traits::AnswerSource;
use eduassist_core::{Candidate, SourceKind};

use crate::index::{classify, VectorIndex};

/// Subject-filtered nearest-neighbour lookup as an [`AnswerSource`]. Yields
/// the `k` nearest documents that clear the threshold, nearest first, so the
/// head candidate is what [`VectorIndex::best_answer`] would return.
pub struct VectorSource {
    index: Arc<VectorIndex>,
    threshold: f32,
    k: usize,
}

impl VectorSource {
    pub fn new(index: Arc<VectorIndex>, threshold: f32) -> Self {
        Self { index, threshold, k: 1 }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }
}

#[async_trait]
impl AnswerSource for VectorSource {
    fn name(&self) -> &str {
        "vector"
    }

    async fn search(&self, query: &str, subject_key: &str) -> anyhow::Result<Vec<Candidate>> {
        let hits = self.index.try_search(query, self.k, Some(subject_key)).await?;
        if let Some(best) = hits.first().filter(|h| h.similarity < self.threshold) {
            tracing::debug!(similarity = best.similarity, threshold = self.threshold, "nearest document below threshold");
        }
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let result = classify(Some(&hit), self.threshold);
                result.is_found().then(|| Candidate {
                    subject_key: hit.subject,
                    topic_key: hit.topic,
                    answer: result.answer,
                    match_type: result.match_type,
                    score: hit.similarity,
                    source: SourceKind::Vector,
                })
            })
            .collect())
    }
}
