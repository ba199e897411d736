//! eduassist-keyword
//!
//! Exact-substring keyword scoring over the knowledge base. Cheap and
//! deterministic; the fallback strategy when the vector index is unavailable.

pub mod matcher;
pub mod source;

pub use matcher::KeywordMatcher;
pub use source::KeywordSource;
