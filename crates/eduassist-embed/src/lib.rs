//! eduassist-embed
//!
//! Text embedders behind `eduassist_core::traits::Embedder`: the local BGE-M3
//! model (candle) and a deterministic hash embedder selected with
//! `APP_USE_FAKE_EMBEDDINGS=1`.

pub mod bge;
pub mod device;
pub mod fake;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use std::sync::Arc;

use eduassist_core::traits::Embedder;

pub use bge::{BgeM3Embedder, BGE_M3_DIM};
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(BGE_M3_DIM)));
    }
    Ok(Arc::new(BgeM3Embedder::new()?))
}
