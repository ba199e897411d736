//! eduassist-resolver
//!
//! Composes the general keyword override with subject-scoped answer sources
//! and a default-subject fallback into a single `resolve` call that never
//! fails.

pub mod resolver;

pub use resolver::{Resolution, Resolver, NO_MATCH_GUIDANCE};
