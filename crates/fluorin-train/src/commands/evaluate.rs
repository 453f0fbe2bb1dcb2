use anyhow::{Context, Result};
use fluorin_train::{pipeline, Trainer, TrainingConfig};
use std::path::PathBuf;
use validator::Validate;

pub fn execute(config: TrainingConfig, checkpoint: PathBuf) -> Result<()> {
    config.validate()?;
    let device = fluorin_plms::device(config.cpu)?;
    let splits = pipeline::prepare_embeddings(&config, &device)?;
    let trainer = Trainer::from_checkpoint(
        &checkpoint,
        splits.test.embed_dim(),
        &config.head,
        config.training.clone(),
        config.paths(),
        &device,
    )
    .with_context(|| format!("loading head from {}", checkpoint.display()))?;
    let metrics = trainer.evaluate(&splits.test)?;
    tracing::info!(loss = metrics.loss, spearman = ?metrics.spearman, "test metrics");
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
