use eduassist_core::traits::Embedder;
use eduassist_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let embedder = get_default_embedder()?;
    let texts = vec!["What is a for loop?".to_string(), "Explain normalization".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.id(), embs.len(), embedder.dim());
    Ok(())
}
