//! eduassist-vector
//!
//! LanceDB-backed semantic index over the knowledge base: one row per topic
//! with a non-empty answer, cosine distance, optional subject filter, and a
//! content-hash embedding cache so repopulating does not re-embed.

pub mod cache;
pub mod index;
pub mod schema;
pub mod source;
pub mod table;

pub use index::{classify, similarity_from_distance, IndexStats, VectorHit, VectorIndex};
pub use source::VectorSource;
