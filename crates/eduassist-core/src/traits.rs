use async_trait::async_trait;

use crate::types::Candidate;

/// Text embedding provider. Implementations return L2-normalised vectors of
/// `dim()` floats, one per input text.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, used to key cached vectors.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// One answer-lookup strategy. The resolver composes several of these in
/// priority order and takes the first non-empty result.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates for `query` scoped to `subject_key`, best first.
    async fn search(&self, query: &str, subject_key: &str) -> anyhow::Result<Vec<Candidate>>;
}
