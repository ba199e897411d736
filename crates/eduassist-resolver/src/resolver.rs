use std::sync::Arc;
use tracing::{debug, warn};

use eduassist_core::traits::AnswerSource;
use eduassist_core::{Candidate, MatchResult, SourceKind, DEFAULT_SUBJECT};
use eduassist_keyword::KeywordMatcher;

/// Shown to the user when nothing matched.
pub const NO_MATCH_GUIDANCE: &str = "I couldn't find an answer to that question. \
Try rephrasing it or using different keywords, check that the right course is selected, \
or generate some practice questions for this subject.";

/// Outcome of [`Resolver::resolve_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub result: MatchResult,
    /// Name of the source that produced the answer, `None` for the general
    /// override and for misses.
    pub source: Option<String>,
    /// Subject the answer was found in after any fallback.
    pub subject_key: Option<String>,
}

impl Resolution {
    fn miss() -> Self {
        Self { result: MatchResult::not_found(), source: None, subject_key: None }
    }

    pub fn is_found(&self) -> bool {
        self.result.is_found()
    }

    pub fn display_text(&self) -> &str {
        if self.is_found() { &self.result.answer } else { NO_MATCH_GUIDANCE }
    }
}

/// Answer lookup pipeline.
///
/// 1. general keyword override
/// 2. each source in the order it was added, scoped to the requested subject
/// 3. the same again for the default subject, when it differs
pub struct Resolver {
    matcher: KeywordMatcher,
    sources: Vec<Arc<dyn AnswerSource>>,
    default_subject: String,
}

impl Resolver {
    pub fn new(matcher: KeywordMatcher) -> Self {
        Self { matcher, sources: Vec::new(), default_subject: DEFAULT_SUBJECT.to_string() }
    }

    pub fn with_source(mut self, source: Arc<dyn AnswerSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn default_subject(mut self, subject_key: impl Into<String>) -> Self {
        self.default_subject = subject_key.into();
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, query: &str, subject_key: &str) -> MatchResult {
        self.resolve_detailed(query, subject_key).await.result
    }

    pub async fn resolve_detailed(&self, query: &str, subject_key: &str) -> Resolution {
        if let Some(general) = self.matcher.match_general(query).filter(MatchResult::is_found) {
            debug!("general override");
            return Resolution { result: general, source: None, subject_key: None };
        }
        if let Some(hit) = self.scoped(query, subject_key).await {
            return hit;
        }
        if subject_key != self.default_subject {
            debug!(from = subject_key, to = %self.default_subject, "falling back to default subject");
            if let Some(hit) = self.scoped(query, &self.default_subject).await {
                return hit;
            }
        }
        debug!(subject = subject_key, "no answer");
        Resolution::miss()
    }

    async fn scoped(&self, query: &str, subject_key: &str) -> Option<Resolution> {
        for source in &self.sources {
            let candidates = match source.search(query, subject_key).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(source = source.name(), subject = subject_key, error = %e, "answer source failed");
                    continue;
                }
            };
            if let Some(best) = candidates.into_iter().find(|c| !c.answer.is_empty()) {
                debug!(source = source.name(), topic = %best.topic_key, score = best.score, "answer found");
                return Some(Resolution {
                    source: Some(source.name().to_string()),
                    subject_key: Some(best.subject_key.clone()),
                    result: into_match(best),
                });
            }
        }
        None
    }
}

fn into_match(c: Candidate) -> MatchResult {
    let result = MatchResult::found(c.answer, c.match_type);
    match c.source {
        SourceKind::Vector => result.with_similarity(c.score),
        SourceKind::Keyword => result,
    }
}
