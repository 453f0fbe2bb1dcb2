use anyhow::Result;
use fluorin_train::{pipeline, TrainingConfig};
use std::path::PathBuf;
use validator::Validate;

pub fn execute(mut config: TrainingConfig, out: PathBuf) -> Result<()> {
    config.embedding_cache = Some(out);
    config.validate()?;
    let device = fluorin_plms::device(config.cpu)?;
    let splits = pipeline::prepare_embeddings(&config, &device)?;
    for (split, dataset) in splits.iter() {
        println!(
            "{split}\t{}\t{}",
            dataset.len(),
            dataset.embed_dim()
        );
    }
    Ok(())
}
