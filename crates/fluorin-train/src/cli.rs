use super::commands;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fluorin_plms::EncoderKind;
use fluorin_train::{DatasetSource, TrainingConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract embeddings, train the head and evaluate the best checkpoint
    Train {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        save_total_limit: Option<usize>,
    },
    /// Extract and cache embeddings for every split
    Embed {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        out: PathBuf,
    },
    /// Score a saved head on the test split
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        checkpoint: PathBuf,
    },
}

/// Settings shared by every subcommand. Flags override values from `--config`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// JSON run configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub encoder: Option<EncoderKind>,
    #[arg(long)]
    pub max_length: Option<usize>,
    /// Directory holding train/valid/test `.csv` or `.parquet` files
    #[arg(long, conflicts_with = "hub_repo")]
    pub data_dir: Option<PathBuf>,
    /// Hugging Face dataset repository
    #[arg(long)]
    pub hub_repo: Option<String>,
    #[arg(long)]
    pub run_name: Option<String>,
    #[arg(long)]
    pub output_root: Option<PathBuf>,
    #[arg(long)]
    pub embedding_cache: Option<PathBuf>,
    #[arg(long)]
    pub cpu: bool,
}

impl CommonArgs {
    pub fn resolve(&self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)?,
            None => TrainingConfig::default(),
        };
        if let Some(encoder) = self.encoder {
            config.encoder = encoder;
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if let Some(dir) = &self.data_dir {
            config.data.source = DatasetSource::local_dir(dir);
        }
        if let Some(repo) = &self.hub_repo {
            config.data.source = DatasetSource::hub(repo);
        }
        if let Some(run_name) = &self.run_name {
            config.run_name = run_name.clone();
        }
        if let Some(output_root) = &self.output_root {
            config.output_root = output_root.clone();
        }
        if let Some(cache) = &self.embedding_cache {
            config.embedding_cache = Some(cache.clone());
        }
        config.cpu |= self.cpu;
        Ok(config)
    }
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Train {
                common,
                epochs,
                learning_rate,
                batch_size,
                seed,
                save_total_limit,
            } => {
                let mut config = common.resolve()?;
                let args = &mut config.training;
                args.num_epochs = epochs.unwrap_or(args.num_epochs);
                args.learning_rate = learning_rate.unwrap_or(args.learning_rate);
                args.batch_size = batch_size.unwrap_or(args.batch_size);
                args.seed = seed.unwrap_or(args.seed);
                if save_total_limit.is_some() {
                    args.save_total_limit = save_total_limit;
                }
                commands::train::execute(config)
            }
            Commands::Embed { common, out } => commands::embed::execute(common.resolve()?, out),
            Commands::Evaluate { common, checkpoint } => {
                commands::evaluate::execute(common.resolve()?, checkpoint)
            }
        }
    }
}
