#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod knowledge;
pub mod practice;
pub mod subjects;
pub mod traits;
pub mod types;

pub use knowledge::{KnowledgeBase, SharedKnowledge, Subject};
pub use types::{Candidate, IndexedDocument, MatchResult, MatchType, SourceKind, TopicRecord, DEFAULT_SUBJECT, GENERAL_SUBJECT};
