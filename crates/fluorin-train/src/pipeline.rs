//! End-to-end run: load, embed, train, report.
use crate::config::TrainingConfig;
use crate::dataset::EmbeddingDataset;
use crate::extract::{extract_splits, EmbeddingCache};
use crate::loader::load_splits;
use crate::splits::Splits;
use crate::trainer::{Trainer, TrainingReport};
use anyhow::Result;
use candle_core::Device;
use validator::Validate;

/// Embeddings for all three splits, read from the configured cache when it matches
/// the encoder, truncation length and dataset, otherwise extracted (and then cached).
pub fn prepare_embeddings(
    config: &TrainingConfig,
    device: &Device,
) -> Result<Splits<EmbeddingDataset>> {
    let cache = config
        .embedding_cache
        .as_ref()
        .map(|dir| {
            EmbeddingCache::new(
                dir,
                &config.encoder.to_string(),
                config.max_length,
                &config.data,
            )
        });
    if let Some(cache) = &cache {
        if let Some(splits) = cache.load(device)? {
            return Ok(splits);
        }
    }

    let records = load_splits(&config.data)?;
    let splits = {
        let encoder = config.encoder.load(device)?;
        extract_splits(encoder.as_ref(), &records, config.max_length)?
    };
    if let Some(cache) = &cache {
        cache.store(&splits)?;
    }
    Ok(splits)
}

pub fn run(config: &TrainingConfig) -> Result<TrainingReport> {
    config.validate()?;
    let device = fluorin_plms::device(config.cpu)?;
    let paths = config.paths();
    paths.create()?;
    config.save(&paths.config_json())?;
    tracing::info!(
        run = %config.run_name,
        encoder = %config.encoder,
        max_length = config.max_length,
        output = %paths.root().display(),
        "run configured"
    );

    let splits = prepare_embeddings(config, &device)?;
    let mut trainer = Trainer::init(
        splits.train.embed_dim(),
        &config.head,
        config.training.clone(),
        paths,
        &device,
    )?;
    trainer.train(&splits)
}
