//! Run configuration.
//!
//! A [`TrainingConfig`] is assembled from defaults, an optional JSON file and CLI
//! overrides, validated, and written next to the run's logs so a run can be
//! reproduced from its output directory.
use crate::head::HeadConfig;
use crate::loader::DatasetSource;
use anyhow::{Context, Result};
use fluorin_plms::EncoderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrainingConfig {
    #[validate(length(min = 1))]
    pub run_name: String,
    pub output_root: PathBuf,
    pub encoder: EncoderKind,
    /// Residues kept per sequence before embedding.
    #[validate(range(min = 1))]
    pub max_length: usize,
    /// Force CPU even when CUDA or Metal is available.
    pub cpu: bool,
    /// Directory for persisted embeddings; extraction is skipped when it matches the encoder.
    pub embedding_cache: Option<PathBuf>,
    #[validate(nested)]
    pub data: DataConfig,
    #[validate(nested)]
    pub head: HeadConfig,
    #[validate(nested)]
    pub training: TrainingArgs,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            run_name: "fluorescence".to_string(),
            output_root: PathBuf::from("."),
            encoder: EncoderKind::Amplify120M,
            max_length: 1024,
            cpu: false,
            embedding_cache: None,
            data: DataConfig::default(),
            head: HeadConfig::default(),
            training: TrainingArgs::default(),
        }
    }
}

impl TrainingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn paths(&self) -> RunPaths {
        RunPaths::new(&self.output_root, &self.run_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataConfig {
    pub source: DatasetSource,
    #[validate(length(min = 1))]
    pub sequence_column: String,
    #[validate(length(min = 1))]
    pub label_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: DatasetSource::default(),
            sequence_column: "primary".to_string(),
            label_column: "log_fluorescence".to_string(),
        }
    }
}

/// Optimizer and loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrainingArgs {
    #[validate(range(min = 1))]
    pub num_epochs: usize,
    #[validate(range(exclusive_min = 0.0))]
    pub learning_rate: f64,
    #[validate(range(min = 0.0))]
    pub weight_decay: f64,
    /// Samples whose losses are averaged into one optimizer step.
    #[validate(range(min = 1))]
    pub batch_size: usize,
    pub warmup_steps: usize,
    pub seed: u64,
    /// Epoch checkpoints kept on disk; the best one is never removed.
    pub save_total_limit: Option<usize>,
    #[validate(range(min = 1))]
    pub logging_steps: usize,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            learning_rate: 1e-3,
            weight_decay: 0.01,
            batch_size: 1,
            warmup_steps: 0,
            seed: 42,
            save_total_limit: Some(2),
            logging_steps: 500,
        }
    }
}

/// Output layout of one run:
///
/// ```text
/// <output_root>/<run_name>/checkpoints/epoch-<n>/model.safetensors
/// <output_root>/<run_name>/checkpoints/best/model.safetensors
/// <output_root>/<run_name>/logs/{metrics.csv,config.json,report.json}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    root: PathBuf,
}

impl RunPaths {
    pub fn new(output_root: &Path, run_name: &str) -> Self {
        Self {
            root: output_root.join(run_name),
        }
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn checkpoints(&self) -> PathBuf {
        self.root.join("checkpoints")
    }
    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }
    pub fn epoch_checkpoint(&self, epoch: usize) -> PathBuf {
        self.checkpoints()
            .join(format!("epoch-{epoch}"))
            .join("model.safetensors")
    }
    pub fn best_checkpoint(&self) -> PathBuf {
        self.checkpoints().join("best").join("model.safetensors")
    }
    pub fn metrics_csv(&self) -> PathBuf {
        self.logs().join("metrics.csv")
    }
    pub fn config_json(&self) -> PathBuf {
        self.logs().join("config.json")
    }
    pub fn report_json(&self) -> PathBuf {
        self.logs().join("report.json")
    }
    pub fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.checkpoints())?;
        std::fs::create_dir_all(self.logs())
    }
}
