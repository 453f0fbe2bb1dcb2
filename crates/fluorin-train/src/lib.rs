//! fluorin-train
//!
//! Train a light-attention regression head on frozen per-residue embeddings to
//! predict log-fluorescence.
//!
//! The pipeline runs in dependency order:
//!
//! 1. [`loader`] reads the labeled train/validation/test splits.
//! 2. [`extract`] truncates each sequence and embeds it once with a frozen encoder.
//! 3. [`dataset`] wraps the `(embedding, label)` pairs for indexed access.
//! 4. [`trainer`] fits a [`head::LightAttentionHead`] with AdamW, evaluates Spearman
//!    correlation every epoch and keeps the best checkpoint.
//!
//! [`pipeline::run`] chains these together from a [`config::TrainingConfig`].
//!
//! ```shell
//! cargo run --release --bin fluorin -- train --encoder amplify-120m --run-name gfp
//! ```
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod head;
pub mod loader;
pub mod logger;
pub mod metrics;
pub mod pipeline;
pub mod splits;
pub mod trainer;

pub use config::{DataConfig, RunPaths, TrainingArgs, TrainingConfig};
pub use dataset::{EmbeddingDataset, Sample};
pub use error::DataError;
pub use extract::{extract_split, extract_splits, EmbeddingCache};
pub use head::{HeadConfig, LightAttentionHead};
pub use loader::{load_splits, read_split, DatasetSource, LabeledSequence};
pub use metrics::{mse, spearman, EvalMetrics};
pub use splits::{SplitName, Splits};
pub use trainer::{select_best, EpochRecord, Trainer, TrainingReport};
