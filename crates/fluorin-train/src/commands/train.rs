use anyhow::Result;
use fluorin_train::{pipeline, TrainingConfig};

pub fn execute(config: TrainingConfig) -> Result<()> {
    let report = pipeline::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
