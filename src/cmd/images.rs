use crate::config::{Config, ImageGenConfig};
use crate::images::{EntryType, ImagePipeline, OpenAiImages, RestStore};
use std::path::PathBuf;
use std::time::Instant;

pub fn run(entry_type: EntryType, limit: Option<usize>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let image_config = match config_path {
        Some(path) => ImageGenConfig::load(&path)?,
        None => ImageGenConfig::default(),
    };
    let config = Config::from_env()?;

    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not configured; image generation requires it"))?;

    let backend = OpenAiImages::new(api_key)?;
    let store = RestStore::new(&config, image_config.storage.bucket.clone())?;
    let pipeline = ImagePipeline::new(&backend, &store, &image_config);

    let limit = limit.unwrap_or(image_config.batch.size);
    println!("=== Generating images for {} (limit {}) ===", entry_type, limit);

    let start_time = Instant::now();
    let summary = pipeline.run(entry_type, limit)?;

    println!();
    println!(
        "=== Completed: {}/{} images generated in {:.1?} ===",
        summary.generated,
        summary.attempted,
        start_time.elapsed()
    );
    Ok(())
}
